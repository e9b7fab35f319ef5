//! Single-slot command mailbox between subscribers and the producer.
//!
//! At most one command is pending. A submission overwrites whatever is
//! waiting; a poll consumes it. Unconsumed commands expire after the
//! command TTL. Submitters get no acknowledgment that the producer ever
//! saw their command.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::domain::{Command, now_millis};
use crate::error::RelayError;
use crate::store::SnapshotStore;

/// Store-backed single-slot mailbox.
#[derive(Debug)]
pub struct CommandMailbox {
    store: Arc<dyn SnapshotStore>,
    key: String,
    ttl: Duration,
}

impl CommandMailbox {
    /// Creates the mailbox over the configured command key.
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, config: &RelayConfig) -> Self {
        Self {
            store,
            key: config.keys.command.clone(),
            ttl: config.command_ttl,
        }
    }

    /// Validates and stores a command, replacing any pending one.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidJson`] or [`RelayError::InvalidPayload`]
    /// for a bad body, [`RelayError::Store`] if the write fails.
    pub async fn submit(&self, body: &[u8]) -> Result<Command, RelayError> {
        let command = Command::from_request(body, now_millis())?;
        let payload =
            serde_json::to_string(&command).map_err(|e| RelayError::Internal(e.to_string()))?;

        self.store.set_ex(&self.key, &payload, self.ttl).await?;
        tracing::info!(
            command = %command.kind,
            ttl_secs = self.ttl.as_secs(),
            "command queued"
        );
        Ok(command)
    }

    /// Consumes the pending command, if any.
    ///
    /// Read and delete are one atomic store operation, so two concurrent
    /// polls never both receive the same command.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] if the store is unreachable and
    /// [`RelayError::Internal`] if the slot holds something that is not a
    /// command (the bad value is consumed either way).
    pub async fn poll(&self) -> Result<Option<Command>, RelayError> {
        let Some(raw) = self.store.take(&self.key).await? else {
            return Ok(None);
        };
        let command = serde_json::from_str::<Command>(&raw).map_err(|e| {
            tracing::error!(error = %e, "discarded unreadable pending command");
            RelayError::Internal(format!("stored command is unreadable: {e}"))
        })?;
        tracing::info!(command = %command.kind, "command delivered to producer");
        Ok(Some(command))
    }

    /// Reports whether a command is waiting, without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] if the store is unreachable.
    pub async fn has_pending(&self) -> Result<bool, RelayError> {
        Ok(self.store.exists(&self.key).await?)
    }
}

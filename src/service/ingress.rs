//! Producer ingress: accepts telemetry pushes from the single producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::config::RelayConfig;
use crate::domain::{SubscriberRegistry, TelemetrySnapshot, now_millis};
use crate::error::RelayError;
use crate::store::SnapshotStore;

/// Outcome of one accepted telemetry push.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// The snapshot as stored and published.
    pub snapshot: TelemetrySnapshot,
    /// Subscribers attached to this instance when the push was handled.
    /// Not a global count.
    pub local_clients: usize,
    /// Relay instances subscribed to the telemetry channel that received
    /// the publish.
    pub instances_reached: usize,
}

/// Stores and publishes telemetry snapshots.
///
/// Each push (1) replaces the stored snapshot with a fresh TTL and
/// (2) publishes the same payload on the telemetry channel. A failure in
/// either step is returned to the producer; nothing is retried here.
#[derive(Debug)]
pub struct ProducerIngress {
    store: Arc<dyn SnapshotStore>,
    registry: Arc<SubscriberRegistry>,
    snapshot_key: String,
    channel: String,
    snapshot_ttl: Duration,
    max_payload_bytes: usize,
    last_timestamp: AtomicI64,
}

impl ProducerIngress {
    /// Creates the ingress for one relay instance.
    #[must_use]
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        registry: Arc<SubscriberRegistry>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            store,
            registry,
            snapshot_key: config.keys.snapshot.clone(),
            channel: config.keys.telemetry_channel.clone(),
            snapshot_ttl: config.snapshot_ttl,
            max_payload_bytes: config.max_body_bytes,
            last_timestamp: AtomicI64::new(0),
        }
    }

    /// Accepts one raw telemetry payload.
    ///
    /// # Errors
    ///
    /// - [`RelayError::PayloadTooLarge`] if `body` exceeds the size limit.
    /// - [`RelayError::InvalidJson`] / [`RelayError::InvalidPayload`] if
    ///   `body` is not a JSON object. The stored snapshot is untouched.
    /// - [`RelayError::Store`] if the store rejects the write or publish.
    pub async fn ingest(&self, body: &[u8]) -> Result<IngestReceipt, RelayError> {
        if body.len() > self.max_payload_bytes {
            return Err(RelayError::PayloadTooLarge {
                limit: self.max_payload_bytes,
            });
        }

        let fields = TelemetrySnapshot::parse_fields(body)?;
        let snapshot = TelemetrySnapshot::new(fields, self.next_timestamp());
        let payload = snapshot.to_json()?;

        self.store
            .set_ex(&self.snapshot_key, &payload, self.snapshot_ttl)
            .await?;
        let instances_reached = self.store.publish(&self.channel, &payload).await?;
        let local_clients = self.registry.len();

        tracing::debug!(
            timestamp = snapshot.timestamp,
            fields = snapshot.fields.len(),
            local_clients,
            instances_reached,
            "telemetry snapshot accepted"
        );

        Ok(IngestReceipt {
            snapshot,
            local_clients,
            instances_reached,
        })
    }

    /// Reads the stored snapshot payload, as last accepted by any instance.
    ///
    /// Returns `None` when nothing was pushed within the snapshot TTL.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] if the store is unreachable.
    pub async fn latest(&self) -> Result<Option<String>, RelayError> {
        Ok(self.store.get(&self.snapshot_key).await?)
    }

    /// Wall-clock milliseconds, never lower than a previously issued value.
    fn next_timestamp(&self) -> i64 {
        let now = now_millis();
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }
}

//! Read-only diagnostic view of the relay.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{LivenessPolicy, RelayConfig};
use crate::domain::{SubscriberRegistry, TelemetrySnapshot, now_millis};
use crate::error::RelayError;
use crate::service::CommandMailbox;
use crate::store::SnapshotStore;

/// Response body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Whether the producer pushed recently enough to count as live.
    pub producer_live: bool,
    /// Same as `producer_live`; kept for dashboards that read this name.
    pub wokwi_connected: bool,
    /// Whether a command is waiting to be polled. Content is not exposed.
    pub has_pending_command: bool,
    /// Subscriber streams attached to the answering instance.
    pub local_clients: usize,
    /// Timestamp of the stored snapshot, if any.
    pub last_update: Option<i64>,
    /// Store backend in use.
    pub backend: String,
}

/// Builds [`StatusReport`]s. Has no side effects.
#[derive(Debug)]
pub struct StatusAggregator {
    store: Arc<dyn SnapshotStore>,
    registry: Arc<SubscriberRegistry>,
    mailbox: Arc<CommandMailbox>,
    snapshot_key: String,
    liveness: LivenessPolicy,
}

impl StatusAggregator {
    /// Creates the aggregator for one relay instance.
    #[must_use]
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        registry: Arc<SubscriberRegistry>,
        mailbox: Arc<CommandMailbox>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            store,
            registry,
            mailbox,
            snapshot_key: config.keys.snapshot.clone(),
            liveness: config.liveness,
        }
    }

    /// Reads the store and assembles the current report.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] only if the store is unreachable.
    pub async fn report(&self) -> Result<StatusReport, RelayError> {
        let stored = self.store.get(&self.snapshot_key).await?;
        let has_pending_command = self.mailbox.has_pending().await?;

        let last_update = stored
            .as_deref()
            .and_then(|raw| serde_json::from_str::<TelemetrySnapshot>(raw).ok())
            .map(|snapshot| snapshot.timestamp);
        let producer_live = self
            .liveness
            .is_live(stored.is_some(), last_update, now_millis());

        Ok(StatusReport {
            producer_live,
            wokwi_connected: producer_live,
            has_pending_command,
            local_clients: self.registry.len(),
            last_update,
            backend: self.store.backend().to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn make_aggregator(liveness: LivenessPolicy) -> (StatusAggregator, Arc<MemoryStore>, RelayConfig) {
        let config = RelayConfig {
            liveness,
            ..RelayConfig::default()
        };
        let store = Arc::new(MemoryStore::default());
        let shared = Arc::clone(&store) as Arc<dyn SnapshotStore>;
        let mailbox = Arc::new(CommandMailbox::new(Arc::clone(&shared), &config));
        let aggregator = StatusAggregator::new(
            shared,
            Arc::new(SubscriberRegistry::new()),
            mailbox,
            &config,
        );
        (aggregator, store, config)
    }

    #[tokio::test]
    async fn idle_relay_reports_nothing_live() {
        let (aggregator, _, _) = make_aggregator(LivenessPolicy::SnapshotPresence);
        let Ok(report) = aggregator.report().await else {
            panic!("report failed");
        };
        assert!(!report.producer_live);
        assert!(!report.wokwi_connected);
        assert!(!report.has_pending_command);
        assert_eq!(report.local_clients, 0);
        assert_eq!(report.last_update, None);
        assert_eq!(report.backend, "memory");
    }

    #[tokio::test]
    async fn fresh_snapshot_is_live_under_window_policy() {
        let (aggregator, store, config) =
            make_aggregator(LivenessPolicy::Window(Duration::from_secs(5)));
        let payload = format!(r#"{{"bat":50,"timestamp":{}}}"#, now_millis());
        let _ = store.set_ex(&config.keys.snapshot, &payload, config.snapshot_ttl).await;

        let Ok(report) = aggregator.report().await else {
            panic!("report failed");
        };
        assert!(report.producer_live);
        assert!(report.last_update.is_some());
    }

    #[tokio::test]
    async fn stale_snapshot_is_not_live_under_window_policy() {
        let (aggregator, store, config) =
            make_aggregator(LivenessPolicy::Window(Duration::from_secs(5)));
        let payload = format!(r#"{{"bat":50,"timestamp":{}}}"#, now_millis() - 30_000);
        let _ = store.set_ex(&config.keys.snapshot, &payload, config.snapshot_ttl).await;

        let Ok(report) = aggregator.report().await else {
            panic!("report failed");
        };
        assert!(!report.producer_live);
    }

    #[tokio::test]
    async fn stale_snapshot_is_live_under_presence_policy() {
        let (aggregator, store, config) = make_aggregator(LivenessPolicy::SnapshotPresence);
        let _ = store
            .set_ex(&config.keys.snapshot, r#"{"bat":50,"timestamp":1}"#, config.snapshot_ttl)
            .await;

        let Ok(report) = aggregator.report().await else {
            panic!("report failed");
        };
        assert!(report.producer_live);
        assert_eq!(report.last_update, Some(1));
    }

    #[tokio::test]
    async fn pending_command_is_flagged_not_consumed() {
        let (aggregator, _, _) = make_aggregator(LivenessPolicy::SnapshotPresence);
        let Ok(_) = aggregator.mailbox.submit(br#"{"type":"start"}"#).await else {
            panic!("submit failed");
        };

        for _ in 0..2 {
            let Ok(report) = aggregator.report().await else {
                panic!("report failed");
            };
            assert!(report.has_pending_command);
        }

        assert!(matches!(aggregator.mailbox.poll().await, Ok(Some(_))));
        let Ok(report) = aggregator.report().await else {
            panic!("report failed");
        };
        assert!(!report.has_pending_command);
    }

    #[test]
    fn serializes_camel_case() {
        let report = StatusReport {
            producer_live: true,
            wokwi_connected: true,
            has_pending_command: false,
            local_clients: 2,
            last_update: Some(5),
            backend: "redis".to_string(),
        };
        let Ok(value) = serde_json::to_value(&report) else {
            panic!("encode failed");
        };
        assert_eq!(
            value,
            serde_json::json!({
                "producerLive": true,
                "wokwiConnected": true,
                "hasPendingCommand": false,
                "localClients": 2,
                "lastUpdate": 5,
                "backend": "redis"
            })
        );
    }
}

//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::domain::SubscriberRegistry;
use crate::service::{CommandMailbox, ProducerIngress, StatusAggregator, StreamManager};
use crate::store::SnapshotStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<RelayConfig>,
    /// Telemetry push handling.
    pub ingress: Arc<ProducerIngress>,
    /// Subscriber streams and fan-out.
    pub streams: Arc<StreamManager>,
    /// Pending command slot.
    pub mailbox: Arc<CommandMailbox>,
    /// Diagnostics.
    pub status: Arc<StatusAggregator>,
    /// Cancelled on shutdown; ends open subscriber streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wires the services of one relay instance over `store`.
    ///
    /// The fan-out task is not started here; call
    /// [`StreamManager::start_fanout`] on [`AppState::streams`].
    #[must_use]
    pub fn new(
        config: RelayConfig,
        store: Arc<dyn SnapshotStore>,
        shutdown: CancellationToken,
    ) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let ingress = ProducerIngress::new(Arc::clone(&store), Arc::clone(&registry), &config);
        let streams = StreamManager::new(Arc::clone(&store), Arc::clone(&registry), &config);
        let mailbox = Arc::new(CommandMailbox::new(Arc::clone(&store), &config));
        let status = StatusAggregator::new(store, registry, Arc::clone(&mailbox), &config);

        Self {
            config: Arc::new(config),
            ingress: Arc::new(ingress),
            streams: Arc::new(streams),
            mailbox,
            status: Arc::new(status),
            shutdown,
        }
    }
}

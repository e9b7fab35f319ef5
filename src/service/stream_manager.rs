//! Subscriber stream manager: registration, fan-out, and teardown.
//!
//! Every relay instance runs one fan-out task subscribed to the store's
//! telemetry channel. Each message from the channel is written, in
//! order, to every stream registered on this instance.
//!
//! Delivery is best-effort with no backpressure. Each subscriber has a
//! bounded buffer; when it is full the frame is dropped for that
//! subscriber only. A write to a stream whose client has gone away is
//! ignored. Deregistration happens only when the [`SubscriberStream`]
//! is dropped, which the HTTP layer does when the client disconnects or
//! a write to the socket fails.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::domain::{ConnectionId, SubscriberRegistry, TelemetrySnapshot};
use crate::store::SnapshotStore;

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Streams the frame was queued for.
    pub delivered: usize,
    /// Streams whose buffer was full; the frame was dropped for them.
    pub dropped: usize,
    /// Streams whose client is gone but which are not yet deregistered.
    pub closed: usize,
}

/// Owns this instance's subscriber registry and fans telemetry out to it.
#[derive(Debug)]
pub struct StreamManager {
    store: Arc<dyn SnapshotStore>,
    registry: Arc<SubscriberRegistry>,
    snapshot_key: String,
    channel: String,
    buffer: usize,
    resubscribe_delay: Duration,
}

impl StreamManager {
    /// Creates the manager for one relay instance.
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
            buffer: config.subscriber_buffer.max(1),
            resubscribe_delay: config.resubscribe_delay,
        }
    }

    /// Number of streams currently registered on this instance.
    #[must_use]
    pub fn local_count(&self) -> usize {
        self.registry.len()
    }

    /// Opens and registers a new subscriber stream.
    ///
    /// The stream first yields the stored snapshot, if one exists, then
    /// every frame broadcast after registration. If the store cannot be
    /// read the stream opens without the initial snapshot.
    pub async fn subscribe(&self) -> SubscriberStream {
        let id = ConnectionId::new();
        let (sender, frames) = mpsc::channel(self.buffer);
        let clients = self.registry.insert(id, sender);

        // Build the guard before awaiting so a cancelled subscribe still
        // deregisters.
        let mut stream = SubscriberStream {
            id,
            frames,
            seed: None,
            floor: None,
            registry: Arc::clone(&self.registry),
        };

        match self.store.get(&self.snapshot_key).await {
            Ok(seed) => stream.seed = seed,
            Err(e) => {
                tracing::warn!(error = %e, connection_id = %id, "could not load last snapshot for new subscriber");
            }
        }

        tracing::debug!(
            connection_id = %id,
            clients,
            seeded = stream.seed.is_some(),
            "subscriber registered"
        );
        stream
    }

    /// Queues `frame` for every registered stream.
    ///
    /// Never fails: full buffers and departed clients are counted in the
    /// report and otherwise ignored. Iterates a copy of the registry so
    /// streams may register or deregister concurrently.
    pub fn broadcast(&self, frame: &str) -> FanoutReport {
        let mut report = FanoutReport::default();
        for (id, sender) in self.registry.snapshot() {
            match sender.try_send(frame.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    tracing::warn!(connection_id = %id, "subscriber buffer full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    report.closed += 1;
                    tracing::debug!(connection_id = %id, "subscriber gone, awaiting deregistration");
                }
            }
        }
        report
    }

    /// Subscribes to the telemetry channel and spawns the fan-out task.
    ///
    /// The first subscription attempt completes before this returns, so
    /// a push made afterwards reaches local subscribers. If the
    /// subscription is lost or cannot be established, the task retries
    /// after the fixed re-subscribe delay until `cancel` fires. Messages
    /// published while unsubscribed are lost for this instance.
    pub async fn start_fanout(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let first_feed = self.open_feed().await;
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_fanout(first_feed, cancel).await })
    }

    async fn open_feed(&self) -> Option<BoxStream<'static, String>> {
        match self.store.subscribe(&self.channel).await {
            Ok(feed) => {
                tracing::info!(
                    channel = %self.channel,
                    backend = self.store.backend(),
                    "subscribed to telemetry channel"
                );
                Some(feed)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    channel = %self.channel,
                    retry_in = ?self.resubscribe_delay,
                    "failed to subscribe to telemetry channel"
                );
                None
            }
        }
    }

    async fn run_fanout(&self, mut feed: Option<BoxStream<'static, String>>, cancel: CancellationToken) {
        loop {
            if let Some(mut frames) = feed.take() {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::info!("fan-out task cancelled");
                            return;
                        }
                        frame = frames.next() => match frame {
                            Some(frame) => {
                                let report = self.broadcast(&frame);
                                tracing::trace!(
                                    delivered = report.delivered,
                                    dropped = report.dropped,
                                    closed = report.closed,
                                    "telemetry fanned out"
                                );
                            }
                            None => {
                                tracing::warn!(
                                    channel = %self.channel,
                                    retry_in = ?self.resubscribe_delay,
                                    "telemetry channel subscription ended"
                                );
                                break;
                            }
                        }
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("fan-out task cancelled during re-subscribe delay");
                    return;
                }
                _ = tokio::time::sleep(self.resubscribe_delay) => {}
            }
            feed = self.open_feed().await;
        }
    }
}

/// One subscriber's ordered feed of telemetry frames.
///
/// Yields the seeded snapshot (if any) first, then live frames in
/// channel order. Pushes that land between registration and the seed
/// read are queued as live frames too; any live frame not newer than
/// the seed is skipped until one newer than the seed arrives.
/// Dropping the stream deregisters it.
#[derive(Debug)]
pub struct SubscriberStream {
    id: ConnectionId,
    frames: mpsc::Receiver<String>,
    seed: Option<String>,
    /// Timestamp of the delivered seed while older live frames may follow.
    floor: Option<i64>,
    registry: Arc<SubscriberRegistry>,
}

impl SubscriberStream {
    /// This stream's connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Stream for SubscriberStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        if let Some(seed) = this.seed.take() {
            this.floor = TelemetrySnapshot::timestamp_of(&seed);
            return Poll::Ready(Some(seed));
        }
        loop {
            match this.frames.poll_recv(cx) {
                Poll::Ready(Some(frame)) => {
                    if let Some(floor) = this.floor {
                        if TelemetrySnapshot::timestamp_of(&frame).is_some_and(|ts| ts <= floor) {
                            continue;
                        }
                        this.floor = None;
                    }
                    return Poll::Ready(Some(frame));
                }
                other => return other,
            }
        }
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        if self.registry.remove(self.id) {
            tracing::debug!(
                connection_id = %self.id,
                clients = self.registry.len(),
                "subscriber deregistered"
            );
        }
    }
}

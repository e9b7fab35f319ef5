//! Long-lived telemetry subscription with fixed-delay reconnect.

use std::time::Duration;

use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;

use super::{ClientError, RelayClient, SseDecoder, SseFrame};
use crate::api::dto::CommandAccepted;
use crate::domain::{CommandValue, TelemetrySnapshot};

/// Delay between a dropped subscription and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Subscribes to `/stream` and keeps the subscription open.
///
/// Retries forever on a fixed delay: no backoff, no jitter, no attempt
/// cap. Commands are not queued while disconnected.
#[derive(Debug, Clone)]
pub struct SubscriberClient {
    client: RelayClient,
    reconnect_delay: Duration,
}

impl SubscriberClient {
    /// Creates a subscriber over `client` using [`DEFAULT_RECONNECT_DELAY`].
    #[must_use]
    pub fn new(client: RelayClient) -> Self {
        Self {
            client,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Overrides the reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Queues a command through the same relay this subscriber watches.
    ///
    /// Not queued locally: if the relay is unreachable the command is lost.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the relay rejects
    /// the command.
    pub async fn send_command(
        &self,
        kind: &str,
        value: Option<CommandValue>,
    ) -> Result<CommandAccepted, ClientError> {
        self.client.submit_command(kind, value).await
    }

    /// Streams telemetry into `on_snapshot` until `cancel` fires.
    ///
    /// Data events that do not decode as a snapshot are logged and
    /// skipped; heartbeats are ignored.
    pub async fn run<F>(&self, cancel: CancellationToken, mut on_snapshot: F)
    where
        F: FnMut(TelemetrySnapshot),
    {
        loop {
            match self.stream_once(&cancel, &mut on_snapshot).await {
                Ok(()) if cancel.is_cancelled() => return,
                Ok(()) => tracing::warn!(
                    retry_in = ?self.reconnect_delay,
                    "telemetry stream closed by relay"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    retry_in = ?self.reconnect_delay,
                    "telemetry stream failed"
                ),
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn stream_once<F>(&self, cancel: &CancellationToken, on_snapshot: &mut F) -> Result<(), ClientError>
    where
        F: FnMut(TelemetrySnapshot),
    {
        let request = self
            .client
            .http()
            .get(self.client.url("/stream"))
            .header(ACCEPT, "text/event-stream")
            .send();
        let mut response = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            response = request => response?,
        };
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                message: response.text().await.unwrap_or_default(),
            });
        }
        tracing::info!(url = %self.client.url("/stream"), "telemetry stream connected");

        let mut decoder = SseDecoder::new();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = response.chunk() => chunk?,
            };
            let Some(bytes) = chunk else {
                return Ok(());
            };
            for frame in decoder.push(&bytes) {
                match frame {
                    SseFrame::Data(data) => match serde_json::from_str::<TelemetrySnapshot>(&data) {
                        Ok(snapshot) => on_snapshot(snapshot),
                        Err(e) => tracing::warn!(error = %e, "skipping undecodable telemetry event"),
                    },
                    SseFrame::Comment(text) => tracing::trace!(comment = %text, "heartbeat"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_immediately_when_already_cancelled() {
        let client = RelayClient::new("http://127.0.0.1:9");
        let subscriber = SubscriberClient::new(client);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut received = 0;
        subscriber.run(cancel, |_| received += 1).await;
        assert_eq!(received, 0);
    }

    #[test]
    fn default_delay_is_five_seconds() {
        let subscriber = SubscriberClient::new(RelayClient::new("http://relay"));
        assert_eq!(subscriber.reconnect_delay, Duration::from_secs(5));
    }
}

//! HTTP clients for the relay.
//!
//! [`RelayClient`] covers the request/response endpoints, as used by the
//! producer (push telemetry, poll commands) and by operator tooling
//! (submit commands, read status). [`SubscriberClient`] holds a
//! telemetry stream open and reconnects on a fixed delay when it drops.

pub mod sse;
pub mod subscriber;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::api::dto::{CommandAccepted, CommandPoll, PushResponse};
use crate::domain::{CommandValue, TelemetrySnapshot};
use crate::error::ErrorResponse;
use crate::service::StatusReport;

pub use sse::{SseDecoder, SseFrame};
pub use subscriber::{DEFAULT_RECONNECT_DELAY, SubscriberClient};

/// Errors returned by the relay clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection, timeout, or body decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a body of an unexpected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The relay answered with a non-success status.
    #[error("relay returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// `error` field of the response body, or the raw body.
        message: String,
    },
}

/// Client for the relay's request/response endpoints.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// Creates a client for the relay mounted at `base_url`, including the
    /// route prefix (e.g. `http://127.0.0.1:3000/api/websocket-relay`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Creates a client that reuses an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Pushes one telemetry snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the relay rejects
    /// the snapshot.
    pub async fn push_telemetry(&self, fields: &Map<String, Value>) -> Result<PushResponse, ClientError> {
        let response = self.http.post(self.url("/wokwi")).json(fields).send().await?;
        decode(response).await
    }

    /// Reads the stored snapshot; `None` when the relay holds none.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// snapshot.
    pub async fn latest_telemetry(&self) -> Result<Option<TelemetrySnapshot>, ClientError> {
        let response = self.http.get(self.url("/telemetry")).send().await?;
        let fields = decode::<Map<String, Value>>(response).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(Value::Object(fields))?))
    }

    /// Queues a command, replacing any pending one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the relay rejects
    /// the command.
    pub async fn submit_command(
        &self,
        kind: &str,
        value: Option<CommandValue>,
    ) -> Result<CommandAccepted, ClientError> {
        let body = json!({ "command": { "type": kind, "value": value } });
        let response = self.http.post(self.url("/command")).json(&body).send().await?;
        decode(response).await
    }

    /// Consumes the pending command, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn poll_command(&self) -> Result<CommandPoll, ClientError> {
        let response = self.http.get(self.url("/command")).send().await?;
        decode(response).await
    }

    /// Reads the relay's status report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn status(&self) -> Result<StatusReport, ClientError> {
        let response = self.http.get(self.url("/status")).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Err(ClientError::Status { status, message })
}

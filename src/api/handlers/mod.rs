//! Relay endpoint handlers organized by concern.

pub mod command;
pub mod stream;
pub mod system;
pub mod telemetry;

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;

use crate::app_state::AppState;
use crate::error::RelayError;

/// Composes the relay routes, relative to the route prefix.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(stream::routes())
        .merge(telemetry::routes())
        .merge(command::routes())
        .merge(system::routes())
}

/// Unwraps a buffered request body, mapping the body-limit rejection to
/// [`RelayError::PayloadTooLarge`] and any other read failure to
/// [`RelayError::InvalidJson`].
pub(crate) fn read_body(
    body: Result<Bytes, BytesRejection>,
    limit: usize,
) -> Result<Bytes, RelayError> {
    match body {
        Ok(bytes) => Ok(bytes),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(RelayError::PayloadTooLarge { limit })
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection, "failed to read request body");
            Err(RelayError::InvalidJson)
        }
    }
}

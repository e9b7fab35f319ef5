//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Each variant
//! maps to a specific HTTP status code and a flat JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::StoreError;

/// JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// { "error": "Invalid JSON", "code": 1001 }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Numeric error code (see [`RelayError`]).
    pub code: u32,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                   |
/// |-----------|------------|-------------------------------|
/// | 1000–1999 | Validation | 400 Bad Request / 413         |
/// | 2000–2999 | Routing    | 404 Not Found                 |
/// | 3000–3999 | Server     | 500 Internal Server Error     |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Request body is not parseable JSON.
    #[error("Invalid JSON")]
    InvalidJson,

    /// Request body parsed but has the wrong shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Request body exceeds the configured size limit.
    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted body size in bytes.
        limit: usize,
    },

    /// No route matches the request path.
    #[error("not found: {0}. available: /stream, /wokwi, /telemetry, /command, /status")]
    NotFound(String),

    /// The shared state store could not serve the request.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidJson => 1001,
            Self::InvalidPayload(_) => 1002,
            Self::PayloadTooLarge { .. } => 1003,
            Self::NotFound(_) => 2001,
            Self::Store(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.error_code(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn invalid_json_is_bad_request_with_fixed_message() {
        let err = RelayError::InvalidJson;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid JSON");
    }

    #[test]
    fn store_failure_is_server_error() {
        let err = RelayError::from(StoreError::Unavailable("connection refused".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), 3001);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn oversized_payload_maps_to_413() {
        let err = RelayError::PayloadTooLarge { limit: 10_000 };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.to_string().contains("10000"));
    }

    #[test]
    fn not_found_lists_available_routes() {
        let err = RelayError::NotFound("/nope".to_string());
        let msg = err.to_string();
        assert!(msg.contains("/nope"));
        assert!(msg.contains("/stream"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn into_response_carries_status() {
        let response = RelayError::InvalidPayload("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

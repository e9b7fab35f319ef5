//! System endpoints: status, health check, and the not-found fallback.

use axum::extract::State;
use axum::http::Uri;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::HealthResponse;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};
use crate::service::StatusReport;

/// `GET /status`: Relay diagnostics.
///
/// # Errors
///
/// Returns [`RelayError`] only if the store is unreachable.
#[utoipa::path(
    get,
    path = "/status",
    tag = "System",
    summary = "Relay status",
    description = "Reports producer liveness, whether a command is pending, and this instance's subscriber count. Never reveals command content.",
    responses(
        (status = 200, description = "Current status", body = StatusReport),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusReport>, RelayError> {
    Ok(Json(state.status.report().await?))
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp. Does not touch the store.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for unknown paths: a JSON 404 listing the relay routes.
pub async fn not_found(uri: Uri) -> RelayError {
    RelayError::NotFound(uri.path().to_string())
}

/// Status route, relative to the route prefix.
pub fn routes() -> Router<AppState> {
    Router::new().route("/status", get(status_handler))
}

/// Health route, mounted at the root regardless of prefix.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

//! Producer telemetry push and last-snapshot endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::PushResponse;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

use super::read_body;

/// `POST /wokwi`: Push one telemetry snapshot.
///
/// # Errors
///
/// Returns [`RelayError`] on a malformed or oversized body, or when the
/// store is unreachable. A rejected push leaves the stored snapshot as
/// it was.
#[utoipa::path(
    post,
    path = "/wokwi",
    tag = "Telemetry",
    summary = "Push telemetry",
    description = "Replaces the stored snapshot and broadcasts it to every subscriber on every relay instance. `clients` counts only this instance's subscribers.",
    request_body(
        content = String,
        content_type = "application/json",
        description = "Flat JSON object of telemetry fields, e.g. `{\"bat\": 88.8, \"thr\": 50}`"
    ),
    responses(
        (status = 200, description = "Snapshot accepted", body = PushResponse),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 413, description = "Body exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn push_telemetry(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PushResponse>, RelayError> {
    let body = read_body(body, state.config.max_body_bytes)?;
    let receipt = state.ingress.ingest(&body).await?;
    Ok(Json(PushResponse {
        success: true,
        clients: receipt.local_clients,
    }))
}

/// `GET /telemetry`: Read the stored snapshot.
///
/// Answers `{}` when no snapshot is stored.
///
/// # Errors
///
/// Returns [`RelayError::Store`] when the store is unreachable.
#[utoipa::path(
    get,
    path = "/telemetry",
    tag = "Telemetry",
    summary = "Latest telemetry",
    description = "Returns the last snapshot pushed to any relay instance, or `{}` if none was pushed within the snapshot TTL.",
    responses(
        (status = 200, description = "Stored snapshot or empty object", content_type = "application/json", body = String),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn latest_telemetry(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RelayError> {
    let body = state
        .ingress
        .latest()
        .await?
        .unwrap_or_else(|| "{}".to_string());
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// Telemetry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wokwi", post(push_telemetry))
        .route("/telemetry", get(latest_telemetry))
}

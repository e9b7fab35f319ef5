//! Command mailbox endpoints: submit from subscribers, poll from the
//! producer.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{CommandAccepted, CommandPoll};
use crate::app_state::AppState;
use crate::domain::now_millis;
use crate::error::{ErrorResponse, RelayError};

use super::read_body;

/// `POST /command`: Queue a command for the producer.
///
/// Overwrites any command still pending. Accepts either
/// `{"command": {"type": ..., "value": ...}}` or the bare inner object.
///
/// # Errors
///
/// Returns [`RelayError`] on a malformed body or an unreachable store.
#[utoipa::path(
    post,
    path = "/command",
    tag = "Commands",
    summary = "Submit a command",
    description = "Stores the command in the single-slot mailbox, replacing any pending command. Unpolled commands expire after the command TTL.",
    request_body(
        content = String,
        content_type = "application/json",
        description = "`{\"command\": {\"type\": \"set_throttle\", \"value\": 75}}` or the bare inner object"
    ),
    responses(
        (status = 200, description = "Command queued", body = CommandAccepted),
        (status = 400, description = "Malformed command", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn submit_command(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CommandAccepted>, RelayError> {
    let body = read_body(body, state.config.max_body_bytes)?;
    let command = state.mailbox.submit(&body).await?;
    Ok(Json(CommandAccepted {
        success: true,
        command,
    }))
}

/// `GET /command`: Consume the pending command.
///
/// # Errors
///
/// Returns [`RelayError`] if the store is unreachable.
#[utoipa::path(
    get,
    path = "/command",
    tag = "Commands",
    summary = "Poll for a command",
    description = "Returns and removes the pending command. `command` is `null` when none is pending.",
    responses(
        (status = 200, description = "Poll result", body = CommandPoll),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn poll_command(State(state): State<AppState>) -> Result<Json<CommandPoll>, RelayError> {
    let command = state.mailbox.poll().await?;
    Ok(Json(CommandPoll {
        command,
        timestamp: now_millis(),
    }))
}

/// Command routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/command", get(poll_command).post(submit_command))
}

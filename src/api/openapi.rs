//! OpenAPI document for the relay endpoints.
//!
//! Relay paths are listed relative to the configured route prefix
//! (`/api/websocket-relay` by default); `/health` is always at the root.

use utoipa::OpenApi;

use crate::api::dto::{CommandAccepted, CommandPoll, HealthResponse, PushResponse};
use crate::api::handlers::{command, stream, system, telemetry};
use crate::domain::{Command, CommandValue};
use crate::error::ErrorResponse;
use crate::service::StatusReport;

/// Generated OpenAPI description, served at `/api-docs/openapi.json`
/// when the `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "skyblue-relay",
        description = "Telemetry fan-out and command mailbox between one simulated aircraft and its dashboards. Relay paths are relative to the route prefix."
    ),
    paths(
        stream::stream_handler,
        telemetry::push_telemetry,
        telemetry::latest_telemetry,
        command::submit_command,
        command::poll_command,
        system::status_handler,
        system::health_handler,
    ),
    components(schemas(
        PushResponse,
        CommandAccepted,
        CommandPoll,
        HealthResponse,
        StatusReport,
        Command,
        CommandValue,
        ErrorResponse,
    )),
    tags(
        (name = "Telemetry", description = "Producer pushes and subscriber streams"),
        (name = "Commands", description = "Single-slot command mailbox"),
        (name = "System", description = "Diagnostics"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_relay_path() {
        let doc = ApiDoc::openapi();
        for path in ["/stream", "/wokwi", "/telemetry", "/command", "/status", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

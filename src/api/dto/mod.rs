//! Response bodies of the relay endpoints.
//!
//! Field names follow what the dashboard and the producer firmware
//! already read, so they are not renamed to Rust conventions on the wire.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Command;

/// Response body of `POST /wokwi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PushResponse {
    /// Always `true` on a 200 response.
    pub success: bool,
    /// Subscriber streams attached to the instance that handled the push.
    /// Not a global count across instances.
    pub clients: usize,
}

/// Response body of `POST /command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommandAccepted {
    /// Always `true` on a 200 response.
    pub success: bool,
    /// The command as stored, with its server-assigned timestamp.
    pub command: Command,
}

/// Response body of `GET /command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommandPoll {
    /// The consumed command, or `null` if none was pending.
    pub command: Option<Command>,
    /// Server time of the poll, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `"healthy"` while the process is serving.
    pub status: String,
    /// Server time as RFC 3339.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}

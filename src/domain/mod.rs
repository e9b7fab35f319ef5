//! Domain layer: telemetry snapshots, commands, and subscriber identity.
//!
//! These types are shared by the relay services, the HTTP layer, and the
//! bundled clients.

pub mod command;
pub mod connection_id;
pub mod subscriber_registry;
pub mod telemetry;

pub use command::{Command, CommandValue};
pub use connection_id::ConnectionId;
pub use subscriber_registry::{FrameSender, SubscriberRegistry};
pub use telemetry::TelemetrySnapshot;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

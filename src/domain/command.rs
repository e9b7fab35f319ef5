//! Operator commands travelling from subscribers to the producer.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use utoipa::openapi::schema::{Object, OneOfBuilder, Schema, Type};
use utoipa::openapi::RefOr;
use utoipa::{PartialSchema, ToSchema};

use crate::error::RelayError;

/// Optional argument attached to a command.
///
/// Numbers keep their JSON representation, so `75` is relayed as `75`
/// and large integers are not rounded through `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    /// Numeric argument, e.g. a throttle setpoint.
    Number(Number),
    /// Text argument, e.g. a mode name.
    Text(String),
}

impl PartialSchema for CommandValue {
    fn schema() -> RefOr<Schema> {
        let one_of = OneOfBuilder::new()
            .item(Schema::Object(Object::with_type(Type::Number)))
            .item(Schema::Object(Object::with_type(Type::String)))
            .description(Some("Number or string argument"))
            .build();
        RefOr::T(Schema::OneOf(one_of))
    }
}

impl ToSchema for CommandValue {
    fn name() -> Cow<'static, str> {
        Cow::Borrowed("CommandValue")
    }
}

/// A command waiting in the mailbox.
///
/// ```json
/// { "type": "set_throttle", "value": 75, "timestamp": 1700000000000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Command {
    /// Command name understood by the producer.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional argument.
    #[serde(default)]
    pub value: Option<CommandValue>,
    /// Server-assigned milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct CommandInput {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Option<CommandValue>,
}

/// Accepted request shapes: the dashboard wraps the command as
/// `{ "command": { ... } }`; other callers may send it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandEnvelope {
    Wrapped { command: CommandInput },
    Bare(CommandInput),
}

impl Command {
    /// Parses a submission body and stamps it with `timestamp`.
    ///
    /// Any client-supplied timestamp is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidJson`] if `body` is not JSON and
    /// [`RelayError::InvalidPayload`] if it lacks a non-empty string
    /// `type` or carries a `value` that is neither a number nor a string.
    pub fn from_request(body: &[u8], timestamp: i64) -> Result<Self, RelayError> {
        let raw: Value = serde_json::from_slice(body).map_err(|_| RelayError::InvalidJson)?;
        let input = match serde_json::from_value::<CommandEnvelope>(raw) {
            Ok(CommandEnvelope::Wrapped { command } | CommandEnvelope::Bare(command)) => command,
            Err(_) => {
                return Err(RelayError::InvalidPayload(
                    "command needs a string `type` and an optional number or string `value`"
                        .to_string(),
                ));
            }
        };

        let kind = input.kind.trim();
        if kind.is_empty() {
            return Err(RelayError::InvalidPayload(
                "command `type` must not be empty".to_string(),
            ));
        }

        Ok(Self {
            kind: kind.to_string(),
            value: input.value,
            timestamp,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dashboard_envelope() {
        let body = br#"{"command": {"type": "set_throttle", "value": 75, "timestamp": 1}}"#;
        let Ok(cmd) = Command::from_request(body, 99) else {
            panic!("expected command");
        };
        assert_eq!(cmd.kind, "set_throttle");
        assert_eq!(cmd.value, Some(CommandValue::Number(Number::from(75))));
        assert_eq!(cmd.timestamp, 99);
    }

    #[test]
    fn accepts_bare_command() {
        let Ok(cmd) = Command::from_request(br#"{"type": "mode", "value": "eco"}"#, 1) else {
            panic!("expected command");
        };
        assert_eq!(cmd.kind, "mode");
        assert_eq!(cmd.value, Some(CommandValue::Text("eco".to_string())));
    }

    #[test]
    fn value_is_optional() {
        let Ok(cmd) = Command::from_request(br#"{"command": {"type": "emergency_stop"}}"#, 1) else {
            panic!("expected command");
        };
        assert_eq!(cmd.value, None);

        let Ok(cmd) = Command::from_request(br#"{"type": "start", "value": null}"#, 1) else {
            panic!("expected command");
        };
        assert_eq!(cmd.value, None);
    }

    #[test]
    fn rejects_malformed_json() {
        let result = Command::from_request(b"{\"command\": ", 1);
        assert!(matches!(result, Err(RelayError::InvalidJson)));
    }

    #[test]
    fn rejects_missing_or_blank_type() {
        for body in [&br#"{"value": 1}"#[..], br#"{"type": "  "}"#, br#"{"type": 5}"#] {
            let result = Command::from_request(body, 1);
            assert!(matches!(result, Err(RelayError::InvalidPayload(_))), "{body:?}");
        }
    }

    #[test]
    fn rejects_unsupported_value_kind() {
        let result = Command::from_request(br#"{"type": "toggle", "value": true}"#, 1);
        assert!(matches!(result, Err(RelayError::InvalidPayload(_))));
    }

    #[test]
    fn serializes_with_type_key() {
        let cmd = Command {
            kind: "set_throttle".to_string(),
            value: Some(CommandValue::Number(Number::from(40))),
            timestamp: 7,
        };
        let Ok(encoded) = serde_json::to_string(&cmd) else {
            panic!("encode failed");
        };
        assert_eq!(encoded, r#"{"type":"set_throttle","value":40,"timestamp":7}"#);
    }

    #[test]
    fn integer_values_survive_storage_unchanged() {
        let body = br#"{"type": "seq", "value": 9007199254740993}"#;
        let Ok(cmd) = Command::from_request(body, 1) else {
            panic!("expected command");
        };
        let Ok(stored) = serde_json::to_string(&cmd) else {
            panic!("encode failed");
        };
        assert!(stored.contains(r#""value":9007199254740993"#), "{stored}");

        let Ok(decoded) = serde_json::from_str::<Command>(&stored) else {
            panic!("decode failed");
        };
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn fractional_values_are_kept() {
        let Ok(cmd) = Command::from_request(br#"{"type": "trim", "value": 2.5}"#, 1) else {
            panic!("expected command");
        };
        let Ok(stored) = serde_json::to_string(&cmd) else {
            panic!("encode failed");
        };
        assert!(stored.contains(r#""value":2.5"#), "{stored}");
    }
}

//! Telemetry snapshot pushed by the producer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RelayError;

/// One full telemetry record from the producer.
///
/// The field mapping is opaque to the relay (engine state, battery and
/// fuel levels, throttle, thrust, environmental figures). The relay only
/// owns `timestamp`, which it assigns on ingest. A new snapshot replaces
/// the previous one wholesale.
///
/// Serializes flat: `{ "bat": 88.8, "thr": 50, ..., "timestamp": 1700000000000 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Producer-supplied fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Server-assigned milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl TelemetrySnapshot {
    /// Builds a snapshot, discarding any producer-supplied `timestamp`
    /// field in favor of `timestamp`.
    #[must_use]
    pub fn new(mut fields: Map<String, Value>, timestamp: i64) -> Self {
        fields.remove("timestamp");
        Self { fields, timestamp }
    }

    /// Parses a raw producer payload into its field mapping.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidJson`] if `body` is not JSON and
    /// [`RelayError::InvalidPayload`] if it is JSON but not an object.
    pub fn parse_fields(body: &[u8]) -> Result<Map<String, Value>, RelayError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(RelayError::InvalidPayload(
                "telemetry snapshot must be a JSON object".to_string(),
            )),
            Err(_) => Err(RelayError::InvalidJson),
        }
    }

    /// Serializes the snapshot into the wire payload stored and published.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if serialization fails.
    pub fn to_json(&self) -> Result<String, RelayError> {
        serde_json::to_string(self)
            .map_err(|e| RelayError::Internal(format!("failed to encode snapshot: {e}")))
    }

    /// Reads only the `timestamp` of a stored or published payload.
    ///
    /// Returns `None` when `raw` is not a timestamped snapshot.
    #[must_use]
    pub fn timestamp_of(raw: &str) -> Option<i64> {
        #[derive(Deserialize)]
        struct Stamp {
            timestamp: i64,
        }
        serde_json::from_str::<Stamp>(raw).ok().map(|s| s.timestamp)
    }

    /// Milliseconds elapsed between the snapshot and `now_ms`.
    #[must_use]
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_payload() {
        let Ok(fields) = TelemetrySnapshot::parse_fields(br#"{"bat": 88.8, "mot": 1, "eme": false}"#)
        else {
            panic!("expected object");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("bat"), Some(&Value::from(88.8)));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = TelemetrySnapshot::parse_fields(b"{bat: 88");
        assert!(matches!(result, Err(RelayError::InvalidJson)));
    }

    #[test]
    fn rejects_empty_body() {
        let result = TelemetrySnapshot::parse_fields(b"");
        assert!(matches!(result, Err(RelayError::InvalidJson)));
    }

    #[test]
    fn rejects_non_object_json() {
        for body in [&b"[1,2,3]"[..], b"42", b"\"text\"", b"null"] {
            let result = TelemetrySnapshot::parse_fields(body);
            assert!(matches!(result, Err(RelayError::InvalidPayload(_))));
        }
    }

    #[test]
    fn server_timestamp_replaces_producer_timestamp() {
        let Ok(fields) = TelemetrySnapshot::parse_fields(br#"{"thr": 50, "timestamp": 1}"#) else {
            panic!("expected object");
        };
        let snapshot = TelemetrySnapshot::new(fields, 1_700_000_000_000);
        assert_eq!(snapshot.timestamp, 1_700_000_000_000);
        assert!(!snapshot.fields.contains_key("timestamp"));

        let Ok(json) = snapshot.to_json() else {
            panic!("encode failed");
        };
        assert_eq!(json.matches("timestamp").count(), 1);
    }

    #[test]
    fn wire_format_is_flat() {
        let mut fields = Map::new();
        fields.insert("fue".to_string(), Value::from(99.9));
        let snapshot = TelemetrySnapshot::new(fields, 5);

        let Ok(json) = snapshot.to_json() else {
            panic!("encode failed");
        };
        let Ok(value) = serde_json::from_str::<Value>(&json) else {
            panic!("decode failed");
        };
        assert_eq!(value, serde_json::json!({ "fue": 99.9, "timestamp": 5 }));

        let Ok(decoded) = serde_json::from_str::<TelemetrySnapshot>(&json) else {
            panic!("decode failed");
        };
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn timestamp_is_read_without_decoding_fields() {
        assert_eq!(
            TelemetrySnapshot::timestamp_of(r#"{"bat":{"nested":[1]},"timestamp":42}"#),
            Some(42)
        );
        assert_eq!(TelemetrySnapshot::timestamp_of(r#"{"bat":1}"#), None);
        assert_eq!(TelemetrySnapshot::timestamp_of("not json"), None);
    }

    #[test]
    fn age_is_relative_to_now() {
        let snapshot = TelemetrySnapshot::new(Map::new(), 1_000);
        assert_eq!(snapshot.age_ms(4_500), 3_500);
    }
}

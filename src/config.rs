//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every setting has a default, so an
//! empty environment yields a working single-instance relay.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default path prefix the dashboard expects the relay routes under.
pub const DEFAULT_ROUTE_PREFIX: &str = "/api/websocket-relay";

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store; fan-out reaches only this instance's subscribers.
    Memory,
    /// External Redis; fan-out reaches every relay instance.
    Redis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!(
                "unknown STORE_BACKEND `{other}` (expected `memory` or `redis`)"
            )),
        }
    }
}

/// How the status endpoint decides whether the producer is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessPolicy {
    /// Live while a snapshot exists; the snapshot TTL is the window.
    SnapshotPresence,
    /// Live while the last snapshot is younger than the window.
    Window(Duration),
}

impl LivenessPolicy {
    /// Decides liveness from the stored snapshot's presence and timestamp.
    #[must_use]
    pub fn is_live(self, present: bool, last_update_ms: Option<i64>, now_ms: i64) -> bool {
        match self {
            Self::SnapshotPresence => present,
            Self::Window(window) => {
                let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
                present
                    && last_update_ms.is_some_and(|ts| now_ms.saturating_sub(ts) < window_ms)
            }
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Store key and channel names shared by every relay instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    /// Key holding the last telemetry snapshot.
    pub snapshot: String,
    /// Key holding the pending command.
    pub command: String,
    /// Broadcast channel carrying telemetry between instances.
    pub telemetry_channel: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            snapshot: "skyblue_last_telemetry".to_string(),
            command: "skyblue_pending_command".to_string(),
            telemetry_channel: "skyblue_telemetry_stream".to_string(),
        }
    }
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Which store backend to use.
    pub store_backend: StoreBackend,

    /// Redis connection string, used when `store_backend` is `Redis`.
    pub redis_url: String,

    /// Path prefix for relay routes; empty mounts them at the root.
    pub route_prefix: String,

    /// Expiry of the stored telemetry snapshot.
    pub snapshot_ttl: Duration,

    /// Expiry of an unconsumed command.
    pub command_ttl: Duration,

    /// Interval between SSE heartbeat comments.
    pub heartbeat_interval: Duration,

    /// Producer liveness rule for the status endpoint.
    pub liveness: LivenessPolicy,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,

    /// Frames buffered per subscriber before new frames are dropped.
    pub subscriber_buffer: usize,

    /// Capacity of in-process broadcast channels.
    pub channel_capacity: usize,

    /// Fixed delay before the fan-out task re-subscribes after losing its
    /// channel subscription.
    pub resubscribe_delay: Duration,

    /// Store key and channel names.
    pub keys: StoreKeys,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            store_backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            snapshot_ttl: Duration::from_secs(60),
            command_ttl: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(20),
            liveness: LivenessPolicy::Window(Duration::from_secs(5)),
            max_body_bytes: 10_000,
            subscriber_buffer: 64,
            channel_capacity: 1024,
            resubscribe_delay: Duration::from_secs(5),
            keys: StoreKeys::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set or not a valid
    /// number. Calls `dotenvy::dotenv().ok()` to optionally load a `.env`
    /// file. The backend defaults to Redis when `REDIS_URL` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as a
    /// [`SocketAddr`], or if `STORE_BACKEND` names an unknown backend.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let redis_url_env = std::env::var("REDIS_URL").ok();
        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse::<StoreBackend>()?,
            Err(_) if redis_url_env.is_some() => StoreBackend::Redis,
            Err(_) => StoreBackend::Memory,
        };
        let redis_url = redis_url_env.unwrap_or(defaults.redis_url);

        let route_prefix = normalize_prefix(
            &std::env::var("ROUTE_PREFIX").unwrap_or_else(|_| DEFAULT_ROUTE_PREFIX.to_string()),
        );

        // The TTL store's own expiry stands in for the liveness window on Redis.
        let default_liveness_ms: u64 = match store_backend {
            StoreBackend::Memory => 5_000,
            StoreBackend::Redis => 0,
        };
        let liveness = match parse_env("LIVENESS_WINDOW_MS", default_liveness_ms) {
            0 => LivenessPolicy::SnapshotPresence,
            ms => LivenessPolicy::Window(Duration::from_millis(ms)),
        };

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            store_backend,
            redis_url,
            route_prefix,
            snapshot_ttl: Duration::from_secs(parse_env("SNAPSHOT_TTL_SECS", 60)),
            command_ttl: Duration::from_secs(parse_env("COMMAND_TTL_SECS", 10)),
            heartbeat_interval: Duration::from_secs(
                parse_env::<u64>("HEARTBEAT_INTERVAL_SECS", 20).max(1),
            ),
            liveness,
            max_body_bytes: parse_env("MAX_BODY_BYTES", defaults.max_body_bytes),
            subscriber_buffer: parse_env("SUBSCRIBER_BUFFER", defaults.subscriber_buffer).max(1),
            channel_capacity: parse_env("CHANNEL_CAPACITY", defaults.channel_capacity).max(1),
            resubscribe_delay: Duration::from_secs(parse_env("RESUBSCRIBE_DELAY_SECS", 5)),
            keys: StoreKeys {
                snapshot: env_or("SNAPSHOT_KEY", defaults.keys.snapshot),
                command: env_or("COMMAND_KEY", defaults.keys.command),
                telemetry_channel: env_or("TELEMETRY_CHANNEL", defaults.keys.telemetry_channel),
            },
            log_format,
        })
    }
}

/// Normalizes a route prefix to `/segment[/segment...]` with no trailing
/// slash; `""` and `"/"` both mean "mount at the root".
#[must_use]
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads a string environment variable, returning `default` when unset
/// or blank.
fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_deployment() {
        let config = RelayConfig::default();
        assert_eq!(config.snapshot_ttl, Duration::from_secs(60));
        assert_eq!(config.command_ttl, Duration::from_secs(10));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(20));
        assert_eq!(config.max_body_bytes, 10_000);
        assert_eq!(config.route_prefix, DEFAULT_ROUTE_PREFIX);
    }

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("api/relay/"), "/api/relay");
        assert_eq!(normalize_prefix(" /api/websocket-relay "), "/api/websocket-relay");
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("Redis".parse::<StoreBackend>(), Ok(StoreBackend::Redis));
        assert!("etcd".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn presence_policy_ignores_age() {
        let policy = LivenessPolicy::SnapshotPresence;
        assert!(policy.is_live(true, Some(0), 1_000_000));
        assert!(!policy.is_live(false, None, 0));
    }

    #[test]
    fn window_policy_uses_snapshot_age() {
        let policy = LivenessPolicy::Window(Duration::from_secs(5));
        assert!(policy.is_live(true, Some(10_000), 14_999));
        assert!(!policy.is_live(true, Some(10_000), 15_000));
        assert!(!policy.is_live(true, None, 10_000));
        assert!(!policy.is_live(false, Some(10_000), 10_001));
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        let value: u64 = parse_env("SKYBLUE_RELAY_TEST_UNSET_KEY", 42);
        assert_eq!(value, 42);
    }
}

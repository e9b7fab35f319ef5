//! Shared state store: TTL keys plus a broadcast channel.
//!
//! Relay instances keep no authoritative state in process memory. The
//! last telemetry snapshot and the pending command live in a
//! [`SnapshotStore`], and telemetry fan-out between instances goes
//! through the store's publish/subscribe channel.
//!
//! Two backends implement the trait:
//!
//! - [`MemoryStore`]: in-process, for single-instance deployments and tests.
//! - [`RedisStore`]: external Redis, for horizontally scaled deployments.

pub mod memory;
pub mod redis_store;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::config::{RelayConfig, StoreBackend};

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected the operation or the connection failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer in time.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Key/value store with expiry and a publish/subscribe channel.
///
/// Every write is last-writer-wins; there is no compare-and-swap.
///
/// # Errors
///
/// Every operation returns [`StoreError`] when the backend is
/// unreachable or does not answer within its timeout.
#[async_trait]
pub trait SnapshotStore: Send + Sync + Debug {
    /// Returns the value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value, expiring
    /// after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically reads and deletes `key`.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns `true` if `key` holds an unexpired value.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Publishes `payload` on `channel`.
    ///
    /// Returns the number of channel subscribers that received it.
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError>;

    /// Subscribes to `channel`, yielding payloads in publish order.
    ///
    /// The stream ends when the backend connection drops; messages
    /// published while no subscription is active are not replayed.
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, StoreError>;

    /// Short backend name for logs and diagnostics.
    fn backend(&self) -> &'static str;
}

/// Builds the store backend selected by the configuration.
///
/// # Errors
///
/// Returns [`StoreError`] if the Redis backend is selected and the
/// initial connection fails.
pub async fn connect(config: &RelayConfig) -> Result<Arc<dyn SnapshotStore>, StoreError> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!(
                "using in-process store; telemetry will not fan out across relay instances"
            );
            Ok(Arc::new(MemoryStore::new(config.channel_capacity)))
        }
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.redis_url).await?;
            Ok(Arc::new(store))
        }
    }
}

//! Redis store backend for multi-instance deployments.
//!
//! Keys are written with `SET key value EX ttl`, consumed atomically with
//! a GET+DEL Lua script, and telemetry is fanned out over Redis
//! `PUBLISH`/`SUBSCRIBE`. Commands go through a shared
//! [`ConnectionManager`], which reconnects on its own; each channel
//! subscription opens a dedicated pub/sub connection.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::time::timeout;

use super::{SnapshotStore, StoreError};

/// Timeout for individual Redis operations.
const REDIS_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads and deletes a key in one round trip.
const TAKE_SCRIPT: &str = r#"
    local value = redis.call("GET", KEYS[1])
    if value then
        redis.call("DEL", KEYS[1])
    end
    return value
"#;

/// [`SnapshotStore`] backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to the Redis server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the URL is invalid or the
    /// server refuses the connection, and [`StoreError::Timeout`] if it
    /// does not answer within five seconds.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = with_timeout(REDIS_TIMEOUT, ConnectionManager::new(client.clone())).await?;
        tracing::info!(op_timeout = ?REDIS_TIMEOUT, "connected to redis");
        Ok(Self {
            client,
            conn,
            op_timeout: REDIS_TIMEOUT,
        })
    }
}

/// Bounds a Redis future by `limit`, flattening both failure modes into
/// [`StoreError`].
async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = RedisResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

#[async_trait]
impl SnapshotStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(self.op_timeout, conn.get::<_, Option<String>>(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // Redis EX has one-second resolution and rejects zero.
        let seconds = ttl.as_secs().max(1);
        with_timeout(self.op_timeout, conn.set_ex::<_, _, ()>(key, value, seconds)).await
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let script = redis::Script::new(TAKE_SCRIPT);
        let value: Option<String> =
            with_timeout(self.op_timeout, script.key(key).invoke_async(&mut conn)).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(self.op_timeout, conn.exists::<_, bool>(key)).await
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(self.op_timeout, conn.publish::<_, _, usize>(channel, payload)).await
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, StoreError> {
        let mut pubsub = with_timeout(self.op_timeout, self.client.get_async_pubsub()).await?;
        with_timeout(self.op_timeout, pubsub.subscribe(channel)).await?;

        let channel = channel.to_string();
        let feed = pubsub.into_on_message().filter_map(move |msg| {
            let channel = channel.clone();
            async move {
                match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        tracing::warn!(error = %e, %channel, "discarding non-text channel payload");
                        None
                    }
                }
            }
        });
        Ok(feed.boxed())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

//! In-process store backend.
//!
//! Keys live in a `HashMap` with per-entry deadlines and are purged
//! lazily on access. Each channel is a [`tokio::sync::broadcast`]
//! channel; when a receiver falls more than `channel_capacity` messages
//! behind, the oldest messages are dropped for it.
//!
//! Deadlines use [`tokio::time::Instant`] so paused-clock tests can
//! advance past a TTL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use super::{SnapshotStore, StoreError};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Single-process [`SnapshotStore`].
///
/// Suitable when exactly one relay instance serves all clients. Several
/// relay instances in the same process may share one `MemoryStore`
/// through an `Arc`.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    channel_capacity: usize,
}

impl MemoryStore {
    /// Creates an empty store whose channels buffer up to
    /// `channel_capacity` messages per lagging receiver.
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Drops `key` if its deadline has passed.
fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
    if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
        entries.remove(key);
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, Instant::now());
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, Instant::now());
        Ok(entries.remove(key).map(|entry| entry.value))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, key, Instant::now());
        Ok(entries.contains_key(key))
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError> {
        // No receivers is not an error: the message is simply dropped.
        Ok(self.sender(channel).send(payload.to_string()).unwrap_or(0))
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, StoreError> {
        let receiver = self.sender(channel).subscribe();
        let channel = channel.to_string();
        let feed = BroadcastStream::new(receiver).filter_map(move |item| {
            let channel = channel.clone();
            async move {
                match item {
                    Ok(payload) => Some(payload),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(%channel, skipped, "channel subscriber lagged, messages dropped");
                        None
                    }
                }
            }
        });
        Ok(feed.boxed())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

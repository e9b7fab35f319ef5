//! Per-instance registry of open subscriber streams.
//!
//! [`SubscriberRegistry`] maps each [`ConnectionId`] to the sending half
//! of that subscriber's frame channel. Entries are added when a stream
//! opens and removed when it is dropped; nothing else mutates the map.
//!
//! The lock is a synchronous [`parking_lot::Mutex`] because removal runs
//! from `Drop`. It is never held across an `.await`.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::ConnectionId;

/// Sending half of one subscriber's outbound frame channel.
pub type FrameSender = mpsc::Sender<String>;

/// Open subscriber streams owned by this relay instance.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    streams: Mutex<HashMap<ConnectionId, FrameSender>>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stream. Returns the number of registered streams
    /// afterwards.
    pub fn insert(&self, id: ConnectionId, sender: FrameSender) -> usize {
        let mut streams = self.streams.lock();
        streams.insert(id, sender);
        streams.len()
    }

    /// Deregisters a stream. Returns `true` if it was registered.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.streams.lock().remove(&id).is_some()
    }

    /// Returns the number of registered streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.lock().len()
    }

    /// Returns `true` if no stream is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.lock().is_empty()
    }

    /// Copies out every registered stream so callers can write to them
    /// without holding the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ConnectionId, FrameSender)> {
        self.streams
            .lock()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = ConnectionId::new();

        assert_eq!(registry.insert(id, tx), 1);
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_unknown_returns_false() {
        let registry = SubscriberRegistry::new();
        assert!(!registry.remove(ConnectionId::new()));
    }

    #[test]
    fn snapshot_is_detached_from_registry() {
        let registry = SubscriberRegistry::new();
        let (tx_a, _rx_a) = mpsc::channel(1);
        let (tx_b, _rx_b) = mpsc::channel(1);
        let a = ConnectionId::new();
        registry.insert(a, tx_a);
        registry.insert(ConnectionId::new(), tx_b);

        let snapshot = registry.snapshot();
        registry.remove(a);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
    }
}

//! Type-safe subscriber connection identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one open subscriber stream on this relay instance.
///
/// Wraps a UUID v4 allocated when the stream is opened. It keys the
/// [`super::SubscriberRegistry`] and appears in connection logs; it is
/// never shared with other instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Allocates a new random `ConnectionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

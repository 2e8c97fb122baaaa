//! The topic a relay serves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a broadcast topic.
///
/// One topic maps to one pub/sub channel and one history list in the store.
/// The history list lives under [`Topic::storage_key`], keeping the raw
/// channel name free for pub/sub.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Create a topic from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The topic name as used for the pub/sub channel.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the topic's history list is stored.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}:data", self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

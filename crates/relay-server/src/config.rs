//! Server configuration.

use relay_core::Topic;
use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Topic this relay serves.
    pub topic: Topic,
    /// Redis URL; `None` selects the in-memory store.
    pub redis_url: Option<String>,
    /// Outbound queue capacity per session.
    pub queue_capacity: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            topic: Topic::from("room1"),
            redis_url: None,
            queue_capacity: 1024,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl ServerConfig {
    /// Apply `RELAY_*` environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("RELAY_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("RELAY_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(topic) = lookup("RELAY_TOPIC") {
            self.topic = Topic::from(topic);
        }
        if let Some(url) = lookup("RELAY_REDIS_URL") {
            self.redis_url = Some(url);
        }
        if let Some(cap) = lookup("RELAY_QUEUE_CAPACITY").and_then(|c| c.parse().ok()) {
            self.queue_capacity = cap;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! The process-singleton bridge from the store's pub/sub channel to the
//! connection registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use metrics::gauge;
use relay_core::Topic;
use relay_store::HistoryStore;
use tracing::{error, info, warn};

use crate::metrics::LISTENER_UP;
use crate::registry::ConnectionRegistry;

/// Consumes the topic's pub/sub stream and fans every payload out to the
/// registry.
///
/// `start` is idempotent: the first call spawns the consume task, later
/// calls are no-ops, so every connection attempt may call it safely. There
/// is no recovery: if the subscription ends or fails, the listener stays
/// down (visible via [`ChannelListener::is_running`] and `/health`) and the
/// process degrades to intra-process relay until restart.
pub struct ChannelListener {
    store: Arc<dyn HistoryStore>,
    registry: Arc<ConnectionRegistry>,
    topic: Topic,
    started: AtomicBool,
    running: AtomicBool,
}

impl ChannelListener {
    /// Create a listener for `topic`. Nothing runs until [`Self::start`].
    #[must_use]
    pub fn new(
        store: Arc<dyn HistoryStore>,
        registry: Arc<ConnectionRegistry>,
        topic: Topic,
    ) -> Self {
        Self {
            store,
            registry,
            topic,
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    /// Spawn the consume task if it has not been spawned yet.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let listener = Arc::clone(self);
        drop(tokio::spawn(listener.consume()));
    }

    /// Whether `start` has ever been called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether the consume task is currently subscribed and reading.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn consume(self: Arc<Self>) {
        let mut stream = match self.store.subscribe(&self.topic).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(topic = %self.topic, error = %e, "channel subscription failed");
                gauge!(LISTENER_UP).set(0.0);
                return;
            }
        };
        self.running.store(true, Ordering::SeqCst);
        gauge!(LISTENER_UP).set(1.0);
        info!(topic = %self.topic, "channel listener consuming");

        while let Some(item) = stream.next().await {
            match item {
                Ok(payload) => {
                    let _ = self.registry.broadcast(payload);
                }
                // Recoverable: skip the item, keep consuming.
                Err(e) => warn!(topic = %self.topic, error = %e, "skipping subscription item"),
            }
        }

        self.running.store(false, Ordering::SeqCst);
        gauge!(LISTENER_UP).set(0.0);
        warn!(
            topic = %self.topic,
            "subscription stream ended, cross-process relay down until restart"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

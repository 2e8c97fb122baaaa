//! Per-session broadcast target.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use relay_core::SessionId;
use tokio::sync::mpsc;

/// A live session as the registry sees it: an ID plus the sending side of
/// its bounded outbound queue.
pub struct SessionHandle {
    /// Session this handle delivers to.
    pub id: SessionId,
    /// Send side of the session's outbound queue.
    tx: mpsc::Sender<Bytes>,
    /// When the session joined.
    pub joined_at: Instant,
    /// Count of payloads dropped because the queue was full or closed.
    dropped: AtomicU64,
}

impl SessionHandle {
    /// Create a handle around a session's outbound queue.
    #[must_use]
    pub fn new(id: SessionId, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            tx,
            joined_at: Instant::now(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a payload without blocking.
    ///
    /// Returns `false` if the queue is full or the session is gone, and
    /// increments the drop counter. Never blocks the caller.
    pub fn send(&self, payload: Bytes) -> bool {
        if self.tx.try_send(payload).is_ok() {
            true
        } else {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total payloads dropped for this session.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// How long the session has been joined.
    pub fn age(&self) -> Duration {
        self.joined_at.elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

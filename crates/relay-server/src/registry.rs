//! Process-wide set of live broadcast targets.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use relay_core::SessionId;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::handle::SessionHandle;
use crate::metrics::BROADCAST_DROPS_TOTAL;

/// Registry of every session currently connected to this process.
///
/// Broadcasting snapshots the membership and runs on its own task, so the
/// caller never waits on fan-out. A failed delivery to one member is counted
/// and logged but never stops delivery to the rest, and membership is not
/// affected: the failing session cleans itself up on its own teardown path.
pub struct ConnectionRegistry {
    members: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Add a session's handle.
    pub async fn add(&self, handle: Arc<SessionHandle>) {
        let mut members = self.members.write().await;
        let _ = members.insert(handle.id.clone(), handle);
    }

    /// Remove a session. Unknown IDs are a no-op.
    pub async fn remove(&self, id: &SessionId) {
        let mut members = self.members.write().await;
        let _ = members.remove(id);
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Deliver `payload` to every member, concurrently with the caller.
    ///
    /// The returned handle resolves to the number of successful deliveries;
    /// callers that do not care may drop it.
    pub fn broadcast(self: &Arc<Self>, payload: Bytes) -> JoinHandle<usize> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let members: Vec<Arc<SessionHandle>> =
                registry.members.read().await.values().cloned().collect();
            let mut delivered = 0;
            for member in &members {
                if member.send(payload.clone()) {
                    delivered += 1;
                } else {
                    counter!(BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(session_id = %member.id, "failed to enqueue broadcast payload");
                }
            }
            debug!(recipients = members.len(), delivered, "broadcast payload");
            delivered
        })
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Session error taxonomy.

use relay_core::TransportError;
use relay_store::StoreError;
use thiserror::Error;

/// Why a session's work failed.
///
/// Transport variants mean the peer went away, which is the ordinary way
/// sessions end; store variants mean history or publish operations failed
/// and the session had to be terminated.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session's transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A store operation on behalf of the session failed.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Transport error taxonomy.
//!
//! Transport failures are the normal way sessions end; they trigger teardown
//! and are logged at debug level, never treated as faults.

use thiserror::Error;

/// Failure on a session's transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer went away or the connection broke mid-frame.
    #[error("connection closed: {0}")]
    Closed(String),

    /// The peer sent something the framing layer could not handle.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying socket I/O failure.
    #[error("transport io: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

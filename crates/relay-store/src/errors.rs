//! Store error taxonomy.

use thiserror::Error;

/// Failure in the history store or its pub/sub channel.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The Redis backend failed an operation.
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// A stored record did not parse back from its JSON form.
    #[error("malformed stored record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    /// A subscriber fell behind the pub/sub channel and missed messages.
    #[error("subscriber lagged, {0} messages skipped")]
    Lagged(u64),

    /// The backend is gone or cannot serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! The transport seam a session runs over.

use async_trait::async_trait;
use bytes::Bytes;
use relay_core::TransportError;

/// Read half of a session's transport.
#[async_trait]
pub trait TransportRx: Send + 'static {
    /// Wait for the next payload.
    ///
    /// `Ok(None)` means the peer closed cleanly; `Err` means the connection
    /// broke. Both end the session.
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError>;
}

/// Write half of a session's transport.
#[async_trait]
pub trait TransportTx: Send + 'static {
    /// Deliver a payload to the peer.
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError>;
}

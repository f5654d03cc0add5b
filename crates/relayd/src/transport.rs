//! Boundary with the transport that owns the sockets.
//!
//! The router never touches sockets directly. It hands raw bytes and a
//! destination handle to a [`Transport`], and treats every failure as
//! non-fatal.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use relay_core::ConnectionId;

/// Errors a transport may report for a single send.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No socket is known for this handle
    #[error("connection {0} is not connected")]
    NotConnected(ConnectionId),

    /// The socket exists but its writer has shut down
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// The socket's outbound queue is full; the frame was dropped
    #[error("connection {0} outbound queue is full")]
    Full(ConnectionId),
}

/// Outbound half of the transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` to `to` as one frame.
    ///
    /// Best-effort: callers log failures and never retry.
    async fn send(&self, to: ConnectionId, payload: Bytes) -> Result<(), TransportError>;
}

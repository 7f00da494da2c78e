//! Error types for the client connection manager.
//!
//! None of these escape [`ConnectionManager::send`](crate::ConnectionManager::send):
//! sending is fire-and-forget, so failures are logged where they happen and
//! the link state machine takes it from there.

/// Errors that can occur on the client side of the link.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Tried to send while not connected. The frame was dropped.
    #[error("transport unavailable: not connected")]
    TransportUnavailable,

    /// The writer for the current socket is gone. The frame was dropped.
    #[error("write to server failed")]
    WriteFailure,

    /// `reconnect` was called before any `connect`.
    #[error("no endpoint configured; call connect first")]
    NoEndpoint,
}

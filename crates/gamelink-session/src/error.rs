//! Error types for the session layer.

use crate::SessionId;

/// Errors that can occur while writing to sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session's writer has gone away; the frame was dropped.
    #[error("write to session {0} failed")]
    WriteFailure(SessionId),

    /// Every session id has been handed out; ids are never reused.
    #[error("session ids exhausted")]
    IdsExhausted,
}

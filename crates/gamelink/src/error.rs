//! Unified error type for the gamelink framework.

use gamelink_client::ClientError;
use gamelink_protocol::ProtocolError;
use gamelink_session::SessionError;
use gamelink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `gamelink` facade you deal with this single error type
/// instead of importing errors from each sub-crate.
#[derive(Debug, thiserror::Error)]
pub enum GameLinkError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (truncated frame, cursor overrun, no handler).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (write to a dead session).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A client link error (no endpoint, link unavailable).
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamelink_protocol::CommandType;
    use gamelink_session::SessionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let gl_err: GameLinkError = err.into();
        assert!(matches!(gl_err, GameLinkError::Transport(_)));
        assert!(gl_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::HandlerNotFound(CommandType(42));
        let gl_err: GameLinkError = err.into();
        assert!(matches!(gl_err, GameLinkError::Protocol(_)));
        assert!(gl_err.to_string().contains("cmd-42"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::WriteFailure(SessionId(3));
        let gl_err: GameLinkError = err.into();
        assert!(matches!(gl_err, GameLinkError::Session(_)));
    }

    #[test]
    fn test_from_client_error() {
        let gl_err: GameLinkError = ClientError::NoEndpoint.into();
        assert!(matches!(gl_err, GameLinkError::Client(_)));
    }
}

//! Error types for the protocol layer.
//!
//! Everything that can go wrong while building, parsing, or dispatching a
//! frame ends up here. None of these are fatal to a connection: callers log
//! the error and drop the frame.

use crate::CommandType;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The input is shorter than the fixed frame header.
    #[error("truncated header: got {len} bytes, need {}", crate::HEADER_LEN)]
    TruncatedHeader { len: usize },

    /// A read asked for more bytes than remain in the buffer.
    #[error("read out of range: need {needed} bytes, {remaining} remaining")]
    OutOfRange { needed: usize, remaining: usize },

    /// A string or byte range is too long for its 2-byte length prefix.
    #[error("length {0} does not fit a 2-byte prefix")]
    LengthOverflow(usize),

    /// A length-prefixed string was not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// No handler is registered for the frame's command type.
    #[error("no handler registered for {0}")]
    HandlerNotFound(CommandType),

    /// Serializing a nested sub-message failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing a nested sub-message failed.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame is well-formed but its contents violate the command's rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Returns `true` if the error means the bytes themselves were malformed.
    ///
    /// A peer that produces these is untrustworthy; what to do about it is
    /// up to the caller.
    pub fn is_decode_error(&self) -> bool {
        match self {
            Self::TruncatedHeader { .. }
            | Self::OutOfRange { .. }
            | Self::InvalidUtf8(_) => true,
            #[cfg(feature = "json")]
            Self::Decode(_) => true,
            _ => false,
        }
    }
}

//! Structured codec for nested payload sub-messages.
//!
//! The frame layer never looks inside a payload; it only stores bytes behind
//! a length prefix. Whatever fills those bytes implements [`PayloadCodec`].
//! [`JsonCodec`] is the stock implementation. A message "schema" is simply
//! the Rust type passed to `encode`/`decode`.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes typed sub-messages to bytes and decodes them back.
///
/// `Send + Sync + 'static` so one codec instance can be shared by every
/// connection task.
pub trait PayloadCodec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`PayloadCodec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use gamelink_protocol::{CommandType, Frame, JsonCodec, DecodedFrame};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Seat { table: u32, seat: u8 }
///
/// let mut frame = Frame::new(CommandType(12));
/// frame.writer().write_message(&JsonCodec, &Seat { table: 3, seat: 1 }).unwrap();
///
/// let decoded = DecodedFrame::decode(frame.as_bytes()).unwrap();
/// let seat: Seat = decoded.reader().read_message(&JsonCodec).unwrap();
/// assert_eq!(seat, Seat { table: 3, seat: 1 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl PayloadCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

//! Wire protocol for gamelink.
//!
//! This crate defines how a game client and server talk to each other:
//!
//! - **Frames** ([`Frame`], [`DecodedFrame`], [`FrameHeader`],
//!   [`CommandType`]) — the fixed 8-byte header and the payload behind it.
//! - **Cursors** ([`ByteWriter`], [`ByteReader`]) — typed, big-endian
//!   sequential access to payload fields.
//! - **Codec** ([`PayloadCodec`], [`JsonCodec`]) — how nested sub-messages
//!   inside a payload are turned into bytes.
//! - **Registry** ([`CommandRegistry`], [`CommandHandler`]) — which handler
//!   runs for which command type.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer doesn't know about sockets or sessions; encoding,
//! decoding, and handler lookup are synchronous and never do I/O.
//!
//! ```text
//! Transport (bytes) → Protocol (DecodedFrame → handler) → Session / Client
//! ```

mod codec;
mod cursor;
mod error;
mod frame;
mod registry;

#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use codec::PayloadCodec;
pub use cursor::{ByteReader, ByteWriter};
pub use error::ProtocolError;
pub use frame::{
    COMMAND_OFFSET, CommandType, DecodedFrame, Frame, FrameHeader, HEADER_LEN,
    SEQUENCE_OFFSET,
};
pub use registry::{CommandHandler, CommandRegistry};

//! Frames: the unit of wire communication.
//!
//! ```text
//! offset 0: u8    flags (0 on write; non-zero means encrypted)
//! offset 1: u8    encryption form (0 on write)
//! offset 2: u32   sequence id, big-endian, patched at send time
//! offset 6: i16   command type, big-endian
//! offset 8: ...   payload
//! ```
//!
//! An outgoing [`Frame`] is serialized as it is built. Its sequence slot
//! holds zeros until the sender knows the frame's place in the send order
//! and calls [`Frame::set_sequence_id`]. Incoming bytes are parsed into a
//! [`DecodedFrame`], which reads the whole header including the sequence id.

use std::fmt;

use crate::{ByteReader, ByteWriter, ProtocolError};

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Byte offset of the 4-byte sequence id slot.
pub const SEQUENCE_OFFSET: usize = 2;

/// Byte offset of the 2-byte command type.
pub const COMMAND_OFFSET: usize = 6;

/// Selects which handler processes a frame.
///
/// Applications define their own command numbers; the core only reserves
/// [`CommandType::ALERT_NOTICE`] for out-of-band notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandType(pub i16);

impl CommandType {
    /// Out-of-band alert/notice channel.
    pub const ALERT_NOTICE: CommandType = CommandType(i16::MIN);

    /// Returns `true` for the alert/notice channel.
    pub fn is_alert(self) -> bool {
        self == Self::ALERT_NOTICE
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

impl From<i16> for CommandType {
    fn from(raw: i16) -> Self {
        Self(raw)
    }
}

/// The parsed fixed header of an incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub is_encrypted: bool,
    /// Reserved selector for an encryption scheme. Carried, never acted on.
    pub encryption_form: u8,
    pub sequence_id: u32,
    pub command_type: CommandType,
}

/// An outgoing frame, serialized as it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command_type: CommandType,
    buf: ByteWriter,
}

impl Frame {
    /// Starts a frame for `command_type` with a zeroed sequence placeholder.
    pub fn new(command_type: CommandType) -> Self {
        let mut buf = ByteWriter::with_capacity(64);
        buf.write_u8(0) // flags
            .write_u8(0) // encryption form
            .write_u32(0) // sequence id placeholder
            .write_i16(command_type.0);
        Self { command_type, buf }
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// The write cursor for the payload; it only ever appends after the
    /// header.
    pub fn writer(&mut self) -> &mut ByteWriter {
        &mut self.buf
    }

    /// Stamps the sequence id into bytes 2..6.
    pub fn set_sequence_id(&mut self, sequence_id: u32) {
        self.buf.patch_u32(SEQUENCE_OFFSET, sequence_id);
    }

    /// The full serialized frame: header plus payload.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Only the payload, after the 8-byte header.
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[HEADER_LEN..]
    }

    /// Copies the serialized frame and stamps `sequence_id` into the copy,
    /// leaving `self` untouched. Used to fan one frame out to many peers.
    pub fn to_stamped_bytes(&self, sequence_id: u32) -> Vec<u8> {
        let mut bytes = self.buf.as_slice().to_vec();
        bytes[SEQUENCE_OFFSET..SEQUENCE_OFFSET + 4]
            .copy_from_slice(&sequence_id.to_be_bytes());
        bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_inner()
    }
}

/// An incoming frame: parsed header plus owned payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    header: FrameHeader,
    payload: Vec<u8>,
}

impl DecodedFrame {
    /// Parses the fixed header and keeps the remaining bytes as payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::TruncatedHeader`] if `bytes` is shorter than
    /// [`HEADER_LEN`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedHeader { len: bytes.len() });
        }
        let mut r = ByteReader::new(bytes);
        let header = FrameHeader {
            is_encrypted: r.read_bool()?,
            encryption_form: r.read_u8()?,
            sequence_id: r.read_u32()?,
            command_type: CommandType(r.read_i16()?),
        };
        Ok(Self {
            header,
            payload: r.rest().to_vec(),
        })
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn command_type(&self) -> CommandType {
        self.header.command_type
    }

    pub fn sequence_id(&self) -> u32 {
        self.header.sequence_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// A fresh read cursor positioned at the start of the payload.
    pub fn reader(&self) -> ByteReader<'_> {
        ByteReader::new(&self.payload)
    }
}

//! Sequential read and write cursors over frame bytes.
//!
//! All multi-byte numbers are big-endian on the wire. Strings and raw byte
//! ranges carry a 2-byte big-endian length prefix. 64-bit integers are moved
//! as eight individual bytes assembled into two 32-bit halves, high half
//! first.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{PayloadCodec, ProtocolError};

/// A growable byte buffer written front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Writes a 64-bit integer as its high 32-bit half then its low half,
    /// one byte at a time, most significant byte first.
    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        let bits = value as u64;
        let high = (bits >> 32) as u32;
        let low = bits as u32;
        for half in [high, low] {
            self.buf.push((half >> 24) as u8);
            self.buf.push((half >> 16) as u8);
            self.buf.push((half >> 8) as u8);
            self.buf.push(half as u8);
        }
        self
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Writes a UTF-8 string with a 2-byte length prefix.
    pub fn write_str(&mut self, value: &str) -> Result<&mut Self, ProtocolError> {
        self.write_bytes(value.as_bytes())
    }

    /// Writes a raw byte range with a 2-byte length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<&mut Self, ProtocolError> {
        let len = u16::try_from(value.len())
            .map_err(|_| ProtocolError::LengthOverflow(value.len()))?;
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(value);
        Ok(self)
    }

    /// Encodes `value` with `codec` and writes it as a length-prefixed
    /// byte range (a nested sub-message).
    pub fn write_message<C, T>(
        &mut self,
        codec: &C,
        value: &T,
    ) -> Result<&mut Self, ProtocolError>
    where
        C: PayloadCodec,
        T: Serialize,
    {
        let encoded = codec.encode(value)?;
        self.write_bytes(&encoded)
    }

    /// Overwrites four bytes at `offset` with `value` (big-endian).
    ///
    /// # Panics
    /// Panics if `offset + 4` is past the end of the buffer.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// A cursor reading typed values off a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Takes the next `n` bytes, or fails without moving the cursor.
    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.remaining() {
            return Err(ProtocolError::OutOfRange {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let buf = self.buf;
        let bytes = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// Any non-zero byte reads as `true`.
    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    /// Reads eight unsigned bytes and shifts them into the high and low
    /// halves of a 64-bit value. Only the first byte carries the sign.
    pub fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        let b = self.take(8)?;
        let high = (u32::from(b[0]) << 24)
            | (u32::from(b[1]) << 16)
            | (u32::from(b[2]) << 8)
            | u32::from(b[3]);
        let low = (u32::from(b[4]) << 24)
            | (u32::from(b[5]) << 16)
            | (u32::from(b[6]) << 8)
            | u32::from(b[7]);
        Ok(((u64::from(high) << 32) | u64::from(low)) as i64)
    }

    pub fn read_f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    /// Reads a 2-byte length prefix followed by that many raw bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], ProtocolError> {
        let start = self.pos;
        let len = usize::from(u16::from_be_bytes(self.take_array()?));
        self.take(len).inspect_err(|_| self.pos = start)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<&'a str, ProtocolError> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(ProtocolError::InvalidUtf8)
    }

    /// Reads a length-prefixed nested sub-message and decodes it with `codec`.
    pub fn read_message<C, T>(&mut self, codec: &C) -> Result<T, ProtocolError>
    where
        C: PayloadCodec,
        T: DeserializeOwned,
    {
        let bytes = self.read_bytes()?;
        codec.decode(bytes)
    }

    /// Returns everything from the cursor to the end without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        let buf = self.buf;
        &buf[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_i16_is_big_endian() {
        let mut w = ByteWriter::new();
        w.write_i16(0x0102).write_i16(-2);
        assert_eq!(w.as_slice(), &[0x01, 0x02, 0xFF, 0xFE]);
    }

    #[test]
    fn test_write_i64_splits_into_high_then_low_half() {
        let mut w = ByteWriter::new();
        w.write_i64(0x0102_0304_0506_0708);
        assert_eq!(w.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_read_i64_negative_value_keeps_sign() {
        let bytes = (-5i64).to_be_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_i64().unwrap(), -5);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_read_i64_low_half_high_bit_does_not_leak_sign() {
        // Low half 0x8000_0000 must not sign-extend into the high half.
        let bytes = [0, 0, 0, 1, 0x80, 0, 0, 0];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_i64().unwrap(), 0x1_8000_0000);
    }

    #[test]
    fn test_scalars_read_back_in_order() {
        let mut w = ByteWriter::new();
        w.write_bool(true)
            .write_u8(200)
            .write_i16(-300)
            .write_i32(-70_000)
            .write_i64(i64::MIN)
            .write_f64(2.5);
        w.write_str("héllo").unwrap();
        w.write_bytes(&[9, 8, 7]).unwrap();

        let mut r = ByteReader::new(w.as_slice());
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_u8().unwrap(), 200);
        assert_eq!(r.read_i16().unwrap(), -300);
        assert_eq!(r.read_i32().unwrap(), -70_000);
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
        assert_eq!(r.read_f64().unwrap(), 2.5);
        assert_eq!(r.read_str().unwrap(), "héllo");
        assert_eq!(r.read_bytes().unwrap(), &[9, 8, 7]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_returns_out_of_range() {
        let mut r = ByteReader::new(&[0x00, 0x01]);
        let err = r.read_i32().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::OutOfRange { needed: 4, remaining: 2 }
        ));
        // A failed read leaves the cursor where it was.
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_i16().unwrap(), 1);
    }

    #[test]
    fn test_read_bytes_declared_length_past_end_fails() {
        // Prefix claims 10 bytes, only 2 follow.
        let mut r = ByteReader::new(&[0x00, 0x0A, 1, 2]);
        assert!(matches!(
            r.read_bytes(),
            Err(ProtocolError::OutOfRange { needed: 10, remaining: 2 })
        ));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_read_str_invalid_utf8_fails() {
        let mut r = ByteReader::new(&[0x00, 0x02, 0xC3, 0x28]);
        assert!(matches!(r.read_str(), Err(ProtocolError::InvalidUtf8(_))));
    }

    #[test]
    fn test_write_bytes_too_long_returns_length_overflow() {
        let mut w = ByteWriter::new();
        let big = vec![0u8; usize::from(u16::MAX) + 1];
        assert!(matches!(
            w.write_bytes(&big),
            Err(ProtocolError::LengthOverflow(65_536))
        ));
        assert!(w.is_empty());
    }

    #[test]
    fn test_patch_u32_overwrites_in_place() {
        let mut w = ByteWriter::new();
        w.write_u32(0).write_u8(0xAA);
        w.patch_u32(0, 0xDEAD_BEEF);
        assert_eq!(w.as_slice(), &[0xDE, 0xAD, 0xBE, 0xEF, 0xAA]);
    }
}

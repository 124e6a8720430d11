//! Typed frame parsing for the control channel
//!
//! A frame is `[magic: u32 LE] [crc: u16 LE] [cmd: u8] [payload...]`.
//! The CRC covers the command byte and payload. Validation order is
//! length, then magic, then CRC; a frame failing any check is rejected
//! whole, with no partial effect.

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::ProtocolError;
use crate::protocol::{crc16, MAGIC};

/// Fixed header length: magic (4) + crc (2) + cmd (1).
pub const HEADER_LEN: usize = 7;
/// Maximum accepted frame length; longer writes are truncated by the caller.
pub const MAX_FRAME_LEN: usize = 256;

/// Wire header at the start of every frame.
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FrameHeader {
    pub magic: U32,
    pub crc: U16,
    pub cmd: u8,
}

/// A validated frame: command byte plus borrowed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub cmd: u8,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Validate and split a raw buffer into command and payload.
    pub fn parse(buf: &'a [u8]) -> Result<Self, ProtocolError> {
        let (header, payload) = FrameHeader::ref_from_prefix(buf)
            .map_err(|_| ProtocolError::TooShort {
                expected: HEADER_LEN,
                got: buf.len(),
            })?;
        if header.magic.get() != MAGIC {
            return Err(ProtocolError::BadMagic {
                got: header.magic.get(),
            });
        }
        // CRC spans the command byte and payload, bytes [6, len).
        let computed = crc16(&buf[HEADER_LEN - 1..]);
        if header.crc.get() != computed {
            return Err(ProtocolError::ChecksumMismatch {
                expected: computed,
                got: header.crc.get(),
            });
        }
        Ok(Frame {
            cmd: header.cmd,
            payload,
        })
    }
}

/// Sequential little-endian field reader over a frame payload.
///
/// Commands with optional trailing fields are "progressive prefix":
/// each `u32` field applies only while four whole bytes remain, and a
/// 1-3 byte tail is ignored. `next_u32` returns `None` once the prefix
/// is exhausted so callers naturally stop applying fields.
#[derive(Debug)]
pub struct FieldCursor<'a> {
    rest: &'a [u8],
}

impl<'a> FieldCursor<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { rest: payload }
    }

    /// Read the next little-endian u32 field, if four bytes remain.
    pub fn next_u32(&mut self) -> Option<u32> {
        let (field, rest) = self.rest.split_first_chunk::<4>()?;
        self.rest = rest;
        Some(u32::from_le_bytes(*field))
    }

    /// Bytes not yet consumed (including any ignored tail).
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, cmd};

    #[test]
    fn parse_roundtrip() {
        let frame = build_frame(cmd::SET_MODE, &[2, 0, 0, 0]);
        let parsed = Frame::parse(&frame).unwrap();
        assert_eq!(parsed.cmd, cmd::SET_MODE);
        assert_eq!(parsed.payload, &[2, 0, 0, 0]);
    }

    #[test]
    fn parse_rejects_short_buffer() {
        let err = Frame::parse(&[0x53, 0x49, 0x44]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::TooShort {
                expected: HEADER_LEN,
                got: 3
            }
        );
    }

    #[test]
    fn parse_rejects_bad_magic() {
        let mut frame = build_frame(cmd::ACTIVATE, &[]);
        frame[0] ^= 0xFF;
        assert!(matches!(
            Frame::parse(&frame),
            Err(ProtocolError::BadMagic { .. })
        ));
    }

    #[test]
    fn parse_rejects_bad_crc() {
        let mut frame = build_frame(cmd::ACTIVATE, &[]);
        frame[4] ^= 0x01;
        assert!(matches!(
            Frame::parse(&frame),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn crc_covers_payload() {
        // Flipping a payload bit must invalidate the checksum.
        let mut frame = build_frame(cmd::SET_MODE, &[1, 0, 0, 0]);
        frame[7] ^= 0x01;
        assert!(matches!(
            Frame::parse(&frame),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn field_cursor_strict_prefix() {
        let payload = [1, 0, 0, 0, 2, 0, 0, 0, 0xAA, 0xBB];
        let mut cursor = FieldCursor::new(&payload);
        assert_eq!(cursor.next_u32(), Some(1));
        assert_eq!(cursor.next_u32(), Some(2));
        // Two trailing bytes are not a whole field
        assert_eq!(cursor.next_u32(), None);
        assert_eq!(cursor.remaining(), 2);
    }

    #[test]
    fn field_cursor_empty() {
        let mut cursor = FieldCursor::new(&[]);
        assert_eq!(cursor.next_u32(), None);
    }
}

//! Protocol error types

use thiserror::Error;

/// Errors produced while validating or decoding a control frame
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame too short: expected at least {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },

    #[error("bad magic: got 0x{got:08X}")]
    BadMagic { got: u32 },

    #[error("checksum mismatch: expected 0x{expected:04X}, got 0x{got:04X}")]
    ChecksumMismatch { expected: u16, got: u16 },

    #[error("payload too short for 0x{cmd:02X}: expected at least {min} bytes, got {got}")]
    ShortPayload { cmd: u8, min: usize, got: usize },
}

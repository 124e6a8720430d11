//! Protocol constants and utilities for the vtouch control channel

use crate::frame::{HEADER_LEN, MAX_FRAME_LEN};

/// Frame magic, little-endian at bytes [0, 4).
pub const MAGIC: u32 = 0x5144_4953;

/// Control channel commands
pub mod cmd {
    pub const SET_SLIDE_KEY: u8 = 0xA1;
    pub const SET_KEY_MAPPING: u8 = 0xA2;
    pub const SET_SENSITIVITY: u8 = 0xA3;
    pub const SET_MODE: u8 = 0xA4;
    pub const SET_JOYSTICK: u8 = 0xA5;
    pub const SET_CONFIG: u8 = 0xA6;
    /// Declared for clients but the device does not dispatch it;
    /// status is observable via `read()` instead.
    pub const GET_STATUS: u8 = 0xA7;
    pub const ACTIVATE: u8 = 0xA8;
    pub const DEACTIVATE: u8 = 0xA9;
    pub const HEARTBEAT: u8 = 0xAA;

    /// Get human-readable name for command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            SET_SLIDE_KEY => "SET_SLIDE_KEY",
            SET_KEY_MAPPING => "SET_KEY_MAPPING",
            SET_SENSITIVITY => "SET_SENSITIVITY",
            SET_MODE => "SET_MODE",
            SET_JOYSTICK => "SET_JOYSTICK",
            SET_CONFIG => "SET_CONFIG",
            GET_STATUS => "GET_STATUS",
            ACTIVATE => "ACTIVATE",
            DEACTIVATE => "DEACTIVATE",
            HEARTBEAT => "HEARTBEAT",
            _ => "UNKNOWN",
        }
    }
}

/// CRC-16 with polynomial 0xA001 (reflected 0x8005), initial value 0xFFFF.
///
/// Matches the CRC-16/MODBUS reference: `crc16(b"123456789") == 0x4B37`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Build a complete frame for `cmd` with the given payload.
///
/// Format: `[magic LE u32] [crc LE u16] [cmd] [payload...]`, where the CRC
/// covers the command byte and payload. Payloads longer than the frame
/// maximum allows are truncated.
pub fn build_frame(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let len = std::cmp::min(payload.len(), MAX_FRAME_LEN - HEADER_LEN);
    let mut buf = Vec::with_capacity(HEADER_LEN + len);
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&[0, 0]); // CRC placeholder
    buf.push(cmd);
    buf.extend_from_slice(&payload[..len]);
    let crc = crc16(&buf[HEADER_LEN - 1..]);
    buf[4..6].copy_from_slice(&crc.to_le_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_reference_vector() {
        // CRC-16/MODBUS check value
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn crc16_empty_is_init() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn crc16_single_byte() {
        // 0x00 through the bit loop from init 0xFFFF
        assert_eq!(crc16(&[0x00]), 0x40BF);
    }

    #[test]
    fn build_frame_layout() {
        let frame = build_frame(cmd::ACTIVATE, &[]);
        assert_eq!(frame.len(), 7);
        assert_eq!(&frame[0..4], &MAGIC.to_le_bytes());
        assert_eq!(frame[6], cmd::ACTIVATE);
        let crc = u16::from_le_bytes([frame[4], frame[5]]);
        assert_eq!(crc, crc16(&frame[6..]));
    }

    #[test]
    fn build_frame_truncates_oversized_payload() {
        let payload = vec![0xAB; 400];
        let frame = build_frame(cmd::SET_CONFIG, &payload);
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }

    #[test]
    fn cmd_names() {
        assert_eq!(cmd::name(cmd::HEARTBEAT), "HEARTBEAT");
        assert_eq!(cmd::name(0x00), "UNKNOWN");
    }
}

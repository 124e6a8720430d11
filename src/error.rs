//! Device error types

use thiserror::Error;
use vtouch_protocol::ProtocolError;

use crate::sink::SinkError;

/// Errors surfaced by the device entry points
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Malformed or undersized request; nothing was applied.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ProtocolError),

    /// A field decoded fine but carries a value with no meaning.
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: u32 },

    /// Well-formed frame carrying a command the device does not dispatch.
    #[error("unsupported command 0x{cmd:02X}")]
    UnsupportedCommand { cmd: u8 },

    /// A required buffer or backing resource could not be obtained.
    #[error("resource exhausted")]
    ResourceExhausted,

    /// Emitting through the attached sink failed.
    #[error("transfer fault: {0}")]
    TransferFault(#[from] SinkError),
}

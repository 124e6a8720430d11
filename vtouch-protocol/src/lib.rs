//! Wire protocol for the vtouch control channel.
//!
//! Every control message is a single self-contained frame:
//! magic + CRC16 + command byte + command-specific payload.

pub mod error;
pub mod frame;
pub mod protocol;

pub use error::ProtocolError;
pub use frame::{FieldCursor, Frame, FrameHeader, HEADER_LEN, MAX_FRAME_LEN};
pub use protocol::{build_frame, cmd, crc16, MAGIC};

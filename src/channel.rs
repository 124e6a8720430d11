//! Control command dispatch
//!
//! Frames are validated by `vtouch-protocol`; this module applies the
//! decoded command to the configuration under the dispatch mutex.
//! Commands with optional trailing fields use the progressive-prefix
//! rule: fields apply in order while whole u32s remain, and a partial
//! trailing field is ignored.

use vtouch_protocol::{cmd, FieldCursor, Frame, ProtocolError};

use crate::config::{DeviceConfig, TouchMode};
use crate::error::DeviceError;
use crate::state::{LinkState, Stats, Tuning};

/// Apply one validated frame. The caller holds the config mutex and
/// counts the command on success.
pub(crate) fn dispatch(
    cfg: &mut DeviceConfig,
    link: &LinkState,
    tuning: &Tuning,
    stats: &Stats,
    frame: Frame<'_>,
) -> Result<(), DeviceError> {
    match frame.cmd {
        cmd::ACTIVATE => {
            link.activate(link.now_ms());
            tracing::info!("link activated");
        }
        cmd::DEACTIVATE => {
            link.deactivate();
            tracing::info!("link deactivated");
        }
        cmd::HEARTBEAT => {
            // Refreshes the lease only; a heartbeat never activates.
            link.heartbeat(link.now_ms());
        }
        cmd::SET_CONFIG => {
            let mut fields = FieldCursor::new(frame.payload);
            let (Some(mode_raw), Some(jitter)) = (fields.next_u32(), fields.next_u32()) else {
                return Err(short_payload(&frame, 8));
            };
            cfg.current_mode = parse_mode(mode_raw)?;
            tuning.set_jitter_range(jitter as i32);
            tracing::debug!(mode = cfg.current_mode.name(), jitter, "config updated");
        }
        cmd::SET_MODE => {
            let mut fields = FieldCursor::new(frame.payload);
            let Some(mode_raw) = fields.next_u32() else {
                return Err(short_payload(&frame, 4));
            };
            cfg.current_mode = parse_mode(mode_raw)?;
            tracing::debug!(mode = cfg.current_mode.name(), "mode set");
        }
        cmd::SET_SENSITIVITY => {
            let mut fields = FieldCursor::new(frame.payload);
            let Some(value) = fields.next_u32() else {
                return Err(short_payload(&frame, 4));
            };
            cfg.view.sensitivity = (value as i32).clamp(1, 10_000);
        }
        cmd::SET_JOYSTICK => {
            // Progressive prefix: a short frame updates only the
            // leading fields. Once the cursor runs dry every later
            // read yields None.
            let js = &mut cfg.joystick;
            let mut fields = FieldCursor::new(frame.payload);
            if let Some(v) = fields.next_u32() {
                js.center_x = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                js.center_y = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                js.radius = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                js.deadzone = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                js.move_slot = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                js.enabled = v != 0;
            }
        }
        cmd::SET_SLIDE_KEY => {
            let sk = &mut cfg.slide_key;
            let mut fields = FieldCursor::new(frame.payload);
            if let Some(v) = fields.next_u32() {
                sk.enabled = v != 0;
            }
            if let Some(v) = fields.next_u32() {
                sk.trigger_key = v;
            }
            if let Some(v) = fields.next_u32() {
                sk.slide_x = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                sk.slide_y = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                sk.max_radius = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                sk.sensitivity = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                sk.hold_time_ms = v as i32;
            }
            if let Some(v) = fields.next_u32() {
                sk.release_delay_ms = v as i32;
            }
        }
        cmd::SET_KEY_MAPPING => {
            // Mapping entries are not accepted over the wire; the list
            // comes from the startup config. A well-formed request with
            // a nonzero flag is acknowledged as a click, a zero flag is
            // a no-op.
            let mut fields = FieldCursor::new(frame.payload);
            let Some(flag) = fields.next_u32() else {
                return Err(short_payload(&frame, 4));
            };
            if flag != 0 {
                stats.record_click();
            }
        }
        other => {
            // GET_STATUS is declared for clients but never dispatched.
            return Err(DeviceError::UnsupportedCommand { cmd: other });
        }
    }
    Ok(())
}

fn parse_mode(raw: u32) -> Result<TouchMode, DeviceError> {
    TouchMode::from_wire(raw).ok_or(DeviceError::InvalidValue {
        field: "mode",
        value: raw,
    })
}

fn short_payload(frame: &Frame<'_>, min: usize) -> DeviceError {
    DeviceError::InvalidRequest(ProtocolError::ShortPayload {
        cmd: frame.cmd,
        min,
        got: frame.payload.len(),
    })
}

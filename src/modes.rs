//! Per-mode key event handling
//!
//! Keyboard events are translated into gesture plans while the config
//! lock is held; the resulting [`Step`]s are executed afterwards so no
//! lock is ever held across an emission or an artificial delay.

use std::time::Duration;

use crate::config::{DeviceConfig, GestureAction, JoystickState, TouchMode};
use crate::inject::Step;
use crate::util::isqrt;

/// Pressure used for synthesized presses that carry no explicit value.
pub const TAP_PRESSURE: i32 = 100;

/// Dwell between the press and release of a cursor double-press tap.
const CURSOR_TAP_DWELL: Duration = Duration::from_millis(50);

const DIR_UP: u8 = 1 << 0;
const DIR_DOWN: u8 = 1 << 1;
const DIR_LEFT: u8 = 1 << 2;
const DIR_RIGHT: u8 = 1 << 3;

/// Gesture plan produced from one key event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
    /// Swipe gestures contained in the plan, counted into the slide
    /// stat once the plan runs.
    pub slides: u64,
}

/// Translate one key event into a gesture plan, updating mode state.
///
/// A press of the mode-switch key advances the mode and consumes the
/// event; everything else flows through the current mode's handler and
/// then the mapping list.
pub fn plan_key_event(cfg: &mut DeviceConfig, keycode: u32, pressed: bool) -> Plan {
    let mut plan = Plan::default();

    if keycode == cfg.mode_switch_key && pressed {
        cfg.current_mode = cfg.current_mode.next();
        tracing::debug!(mode = cfg.current_mode.name(), "mode switched");
        return plan;
    }

    match cfg.current_mode {
        TouchMode::Joystick => {
            joystick_steps(&mut cfg.joystick, keycode, pressed, &mut plan.steps);
        }
        TouchMode::Cursor => {
            // A press repeating the previous event's keycode taps at the
            // cursor position. last_key tracks every non-switch event,
            // so any interposed event breaks the pair.
            if pressed && cfg.cursor.last_key == Some(keycode) {
                let (x, y) = (cfg.cursor.current_x, cfg.cursor.current_y);
                plan.steps.push(Step::Touch {
                    slot: 0,
                    x,
                    y,
                    pressure: TAP_PRESSURE,
                });
                plan.steps.push(Step::Pause(CURSOR_TAP_DWELL));
                plan.steps.push(Step::Touch {
                    slot: 0,
                    x,
                    y,
                    pressure: 0,
                });
                // The tap ends with a release, so no contact stays down
                cfg.cursor.active = false;
            }
            cfg.cursor.last_key = Some(keycode);
        }
        TouchMode::View | TouchMode::Silent => {}
    }

    apply_mappings(cfg, keycode, pressed, &mut plan);
    plan
}

/// Update the direction bitmask and re-derive the stick position.
///
/// The displacement is recomputed from scratch on every event, so
/// opposing held directions cancel exactly. Events for unrelated keys
/// leave the mask untouched but still re-emit the current position.
fn joystick_steps(js: &mut JoystickState, keycode: u32, pressed: bool, steps: &mut Vec<Step>) {
    if !js.enabled {
        return;
    }

    let bit = if keycode == js.key_up {
        Some(DIR_UP)
    } else if keycode == js.key_down {
        Some(DIR_DOWN)
    } else if keycode == js.key_left {
        Some(DIR_LEFT)
    } else if keycode == js.key_right {
        Some(DIR_RIGHT)
    } else {
        None
    };
    if let Some(bit) = bit {
        if pressed {
            js.direction_mask |= bit;
        } else {
            js.direction_mask &= !bit;
        }
    }

    let mut dx = 0i32;
    let mut dy = 0i32;
    if js.direction_mask & DIR_UP != 0 {
        dy -= js.radius;
    }
    if js.direction_mask & DIR_DOWN != 0 {
        dy += js.radius;
    }
    if js.direction_mask & DIR_LEFT != 0 {
        dx -= js.radius;
    }
    if js.direction_mask & DIR_RIGHT != 0 {
        dx += js.radius;
    }

    if dx.abs() < js.deadzone {
        dx = 0;
    }
    if dy.abs() < js.deadzone {
        dy = 0;
    }

    if dx != 0 || dy != 0 {
        let mut x = js.center_x + dx;
        let mut y = js.center_y + dy;

        // Diagonals overshoot the radius; pull the point back onto the
        // circle.
        let distance = isqrt((dx as i64) * (dx as i64) + (dy as i64) * (dy as i64)) as i32;
        if distance > js.radius {
            x = js.center_x + dx * js.radius / distance;
            y = js.center_y + dy * js.radius / distance;
        }

        js.current_x = x;
        js.current_y = y;
        js.active = true;
        steps.push(Step::Touch {
            slot: js.move_slot,
            x,
            y,
            pressure: TAP_PRESSURE,
        });
    } else if js.active {
        js.active = false;
        steps.push(Step::Touch {
            slot: js.move_slot,
            x: 0,
            y: 0,
            pressure: 0,
        });
    }
}

/// Run the ordered mapping list; the first keycode match wins. Mappings
/// apply in every mode, silent included.
fn apply_mappings(cfg: &DeviceConfig, keycode: u32, pressed: bool, plan: &mut Plan) {
    let Some(mapping) = cfg.mappings.iter().find(|m| m.keycode == keycode) else {
        return;
    };

    if pressed {
        match mapping.action {
            GestureAction::Tap { x, y, duration_ms } => {
                plan.steps.push(Step::Touch {
                    slot: mapping.slot,
                    x,
                    y,
                    pressure: TAP_PRESSURE,
                });
                plan.steps.push(Step::Pause(Duration::from_millis(duration_ms)));
                plan.steps.push(Step::Touch {
                    slot: mapping.slot,
                    x,
                    y,
                    pressure: 0,
                });
            }
            GestureAction::Hold { x, y, pressure } => {
                plan.steps.push(Step::Touch {
                    slot: mapping.slot,
                    x,
                    y,
                    pressure,
                });
            }
            GestureAction::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
                duration_ms,
            } => {
                plan.steps.push(Step::Touch {
                    slot: mapping.slot,
                    x: start_x,
                    y: start_y,
                    pressure: TAP_PRESSURE,
                });
                plan.steps.push(Step::Pause(Duration::from_millis(duration_ms)));
                plan.steps.push(Step::Touch {
                    slot: mapping.slot,
                    x: end_x,
                    y: end_y,
                    pressure: TAP_PRESSURE,
                });
                plan.steps.push(Step::Touch {
                    slot: mapping.slot,
                    x: end_x,
                    y: end_y,
                    pressure: 0,
                });
                plan.slides += 1;
            }
        }
    } else if mapping.instant_release {
        plan.steps.push(Step::Touch {
            slot: mapping.slot,
            x: 0,
            y: 0,
            pressure: 0,
        });
    }
}

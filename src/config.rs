//! Device configuration: per-mode synthesis state and TOML bootstrap
//!
//! One `DeviceConfig` lives behind the device's mutex and carries all
//! mutable per-mode state. `StartupConfig` is the serde view loaded from
//! the TOML file at boot; its defaults are the device's factory values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input synthesis mode. The mode-switch key cycles through all four in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchMode {
    Cursor,
    View,
    Joystick,
    #[default]
    Silent,
}

impl TouchMode {
    /// Wire value used by SET_MODE / SET_CONFIG.
    pub fn wire(self) -> u32 {
        match self {
            TouchMode::Cursor => 0,
            TouchMode::View => 1,
            TouchMode::Joystick => 2,
            TouchMode::Silent => 3,
        }
    }

    /// Convert from a wire value; values above 3 have no meaning.
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(TouchMode::Cursor),
            1 => Some(TouchMode::View),
            2 => Some(TouchMode::Joystick),
            3 => Some(TouchMode::Silent),
            _ => None,
        }
    }

    /// Next mode in the cycle.
    pub fn next(self) -> Self {
        match self {
            TouchMode::Cursor => TouchMode::View,
            TouchMode::View => TouchMode::Joystick,
            TouchMode::Joystick => TouchMode::Silent,
            TouchMode::Silent => TouchMode::Cursor,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TouchMode::Cursor => "cursor",
            TouchMode::View => "view",
            TouchMode::Joystick => "joystick",
            TouchMode::Silent => "silent",
        }
    }
}

/// Slide-key gesture parameters. Storage only for now: the wire command
/// updates them field by field, and nothing reads them yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideKeyState {
    pub enabled: bool,
    pub trigger_key: u32,
    pub slide_x: i32,
    pub slide_y: i32,
    pub max_radius: i32,
    pub sensitivity: i32,
    pub hold_time_ms: i32,
    pub release_delay_ms: i32,
}

impl Default for SlideKeyState {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_key: 56,
            slide_x: 1400,
            slide_y: 1000,
            max_radius: 200,
            sensitivity: 100,
            hold_time_ms: 50,
            release_delay_ms: 0,
        }
    }
}

/// Cursor-mode state. `last_key` and `active` are runtime-only:
/// `last_key` is the keycode of the previous non-switch event, driving
/// the double-press tap, and `active` marks a contact in flight
/// (cleared by the tap's release).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorState {
    pub speed: i32,
    pub left_click_x: i32,
    pub left_click_y: i32,
    pub right_click_x: i32,
    pub right_click_y: i32,
    pub current_x: i32,
    pub current_y: i32,
    #[serde(skip)]
    pub last_key: Option<u32>,
    #[serde(skip)]
    pub active: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            speed: 5,
            left_click_x: 2100,
            left_click_y: 1800,
            right_click_x: 2000,
            right_click_y: 1800,
            current_x: 1400,
            current_y: 1000,
            last_key: None,
            active: false,
        }
    }
}

/// View-mode parameters plus drag scratch state. The sensitivity is
/// mutated via SET_SENSITIVITY; the drag behavior that would consume
/// the runtime fields is not part of this service, so they stay at
/// their initial values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub center_x: i32,
    pub center_y: i32,
    pub max_radius: i32,
    pub deadzone: i32,
    pub sensitivity: i32,
    /// Milliseconds before a held view drag releases itself; zero
    /// disables auto-release.
    pub auto_release_time_ms: i32,
    #[serde(skip)]
    pub active: bool,
    #[serde(skip)]
    pub current_x: i32,
    #[serde(skip)]
    pub current_y: i32,
    #[serde(skip)]
    pub last_dx: i32,
    #[serde(skip)]
    pub last_dy: i32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center_x: 1400,
            center_y: 1000,
            max_radius: 300,
            deadzone: 20,
            sensitivity: 100,
            auto_release_time_ms: 0,
            active: false,
            current_x: 0,
            current_y: 0,
            last_dx: 0,
            last_dy: 0,
        }
    }
}

/// Joystick-mode parameters plus the live direction state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickState {
    pub enabled: bool,
    pub center_x: i32,
    pub center_y: i32,
    pub radius: i32,
    pub deadzone: i32,
    pub move_slot: i32,
    pub key_up: u32,
    pub key_down: u32,
    pub key_left: u32,
    pub key_right: u32,
    /// Held-direction bitmask: bit 0 up, 1 down, 2 left, 3 right.
    #[serde(skip)]
    pub direction_mask: u8,
    /// Whether a contact is currently down on `move_slot`.
    #[serde(skip)]
    pub active: bool,
    /// Last emitted stick position; kept across release.
    #[serde(skip)]
    pub current_x: i32,
    #[serde(skip)]
    pub current_y: i32,
}

impl Default for JoystickState {
    fn default() -> Self {
        Self {
            enabled: true,
            center_x: 700,
            center_y: 1500,
            radius: 150,
            deadzone: 10,
            move_slot: 3,
            key_up: 17,
            key_down: 31,
            key_left: 30,
            key_right: 32,
            direction_mask: 0,
            active: false,
            current_x: 0,
            current_y: 0,
        }
    }
}

/// What a matched key mapping does on press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GestureAction {
    /// Press, hold for `duration_ms`, release.
    Tap { x: i32, y: i32, duration_ms: u64 },
    /// Sustained press at a fixed pressure; released on key-up when
    /// `instant_release` is set.
    Hold { x: i32, y: i32, pressure: i32 },
    /// Press at the start point, dwell, move to the end point, release.
    Swipe {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    },
}

/// One keyboard-to-gesture binding. Mappings are ordered; the first
/// entry matching the keycode wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapping {
    pub keycode: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub slot: i32,
    #[serde(default = "default_true")]
    pub instant_release: bool,
    pub action: GestureAction,
}

fn default_true() -> bool {
    true
}

/// All mutable device configuration, guarded by the device mutex.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub current_mode: TouchMode,
    pub mode_switch_key: u32,
    pub slide_key: SlideKeyState,
    pub cursor: CursorState,
    pub view: ViewState,
    pub joystick: JoystickState,
    pub mappings: Vec<KeyMapping>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::from_startup(&StartupConfig::default())
    }
}

impl DeviceConfig {
    pub fn from_startup(boot: &StartupConfig) -> Self {
        Self {
            current_mode: boot.mode,
            mode_switch_key: boot.mode_switch_key,
            slide_key: boot.slide_key.clone(),
            cursor: boot.cursor.clone(),
            view: boot.view.clone(),
            joystick: boot.joystick.clone(),
            mappings: boot.mappings.clone(),
        }
    }
}

/// Startup configuration file (TOML).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    pub screen_width: i32,
    pub screen_height: i32,
    pub jitter_range: i32,
    pub heartbeat_interval_secs: u64,
    pub mode_switch_key: u32,
    pub mode: TouchMode,
    pub slide_key: SlideKeyState,
    pub cursor: CursorState,
    pub view: ViewState,
    pub joystick: JoystickState,
    #[serde(rename = "mapping")]
    pub mappings: Vec<KeyMapping>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            screen_width: 2800,
            screen_height: 2000,
            jitter_range: 2,
            heartbeat_interval_secs: 30,
            mode_switch_key: 59,
            mode: TouchMode::Silent,
            slide_key: SlideKeyState::default(),
            cursor: CursorState::default(),
            view: ViewState::default(),
            joystick: JoystickState::default(),
            mappings: Vec::new(),
        }
    }
}

impl StartupConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file location: `$XDG_CONFIG_HOME/vtouch/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vtouch")
            .join("config.toml")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_cycle_wraps() {
        let mut mode = TouchMode::Cursor;
        for _ in 0..4 {
            mode = mode.next();
        }
        assert_eq!(mode, TouchMode::Cursor);
        assert_eq!(TouchMode::Silent.next(), TouchMode::Cursor);
    }

    #[test]
    fn mode_wire_roundtrip() {
        for mode in [
            TouchMode::Cursor,
            TouchMode::View,
            TouchMode::Joystick,
            TouchMode::Silent,
        ] {
            assert_eq!(TouchMode::from_wire(mode.wire()), Some(mode));
        }
        assert_eq!(TouchMode::from_wire(4), None);
        assert_eq!(TouchMode::from_wire(u32::MAX), None);
    }

    #[test]
    fn startup_defaults_match_factory_values() {
        let boot = StartupConfig::default();
        assert_eq!(boot.screen_width, 2800);
        assert_eq!(boot.screen_height, 2000);
        assert_eq!(boot.jitter_range, 2);
        assert_eq!(boot.heartbeat_interval_secs, 30);
        assert_eq!(boot.mode_switch_key, 59);
        assert_eq!(boot.mode, TouchMode::Silent);
        assert_eq!(boot.joystick.center_x, 700);
        assert_eq!(boot.joystick.move_slot, 3);
        assert_eq!(boot.cursor.current_x, 1400);
        assert!(!boot.cursor.active);
        assert_eq!(boot.view.max_radius, 300);
        assert_eq!(boot.view.auto_release_time_ms, 0);
        assert!(!boot.view.active);
        assert_eq!((boot.view.last_dx, boot.view.last_dy), (0, 0));
        assert_eq!(boot.slide_key.trigger_key, 56);
    }

    #[test]
    fn parse_mapping_table() {
        let text = r#"
            mode = "joystick"
            jitter_range = 0

            [[mapping]]
            keycode = 2
            label = "fire"
            slot = 1
            action = { type = "tap", x = 2400, y = 300, duration_ms = 40 }

            [[mapping]]
            keycode = 3
            instant_release = false
            action = { type = "hold", x = 100, y = 200, pressure = 180 }

            [[mapping]]
            keycode = 4
            action = { type = "swipe", start_x = 500, start_y = 900, end_x = 500, end_y = 400, duration_ms = 120 }
        "#;
        let boot: StartupConfig = toml::from_str(text).unwrap();
        assert_eq!(boot.mode, TouchMode::Joystick);
        assert_eq!(boot.jitter_range, 0);
        assert_eq!(boot.mappings.len(), 3);
        assert!(boot.mappings[0].instant_release);
        assert!(!boot.mappings[1].instant_release);
        assert_eq!(
            boot.mappings[2].action,
            GestureAction::Swipe {
                start_x: 500,
                start_y: 900,
                end_x: 500,
                end_y: 400,
                duration_ms: 120,
            }
        );
        // Unset sections keep factory values
        assert_eq!(boot.joystick.key_up, 17);
    }
}

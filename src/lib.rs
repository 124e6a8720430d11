//! Userspace virtual multi-touch input service.
//!
//! A `TouchDevice` accepts checksummed binary control frames on its write
//! path, keeps per-mode input-synthesis state, and turns keyboard events
//! into synthetic touch contacts emitted through a [`sink::TouchSink`].
//! Background tasks expire stale activations and trim runaway counters.

pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod inject;
pub mod modes;
pub mod sink;
pub mod state;
pub mod util;
pub mod watchdog;
pub mod worker;

pub use config::{DeviceConfig, GestureAction, KeyMapping, StartupConfig, TouchMode};
pub use device::TouchDevice;
pub use error::DeviceError;
pub use inject::Injector;
pub use sink::{RecordingSink, TouchSink, TraceSink, UinputTouchSink};
pub use state::{LinkState, Stats, Tuning};

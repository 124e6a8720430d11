//! Touch emission sinks
//!
//! The injection engine talks to the outside world through [`TouchSink`]:
//! one contact report per call, flushed to consumers by [`TouchSink::sync`].
//! Production uses a uinput virtual device; tests record emissions and
//! dry runs log them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AbsoluteAxisType, EventType, InputEvent, UinputAbsSetup};
use parking_lot::Mutex;
use thiserror::Error;

/// Fixed contact size reported with every press.
pub const NOMINAL_TOUCH_MAJOR: i32 = 10;

/// Maximum pressure value on the wire and toward consumers.
pub const MAX_PRESSURE: i32 = 255;

/// Errors from touch emission
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create virtual touch device: {0}")]
    CreateDevice(#[source] std::io::Error),
    #[error("failed to emit touch events: {0}")]
    EmitEvent(#[source] std::io::Error),
}

/// Consumer of synthesized touch contacts.
///
/// `report_touch` describes one contact change on one slot;
/// `active = false` lifts the contact and the coordinates are ignored.
/// Reports become visible to consumers only at the following `sync`.
pub trait TouchSink: Send {
    fn report_touch(
        &mut self,
        slot: i32,
        x: i32,
        y: i32,
        pressure: i32,
        active: bool,
    ) -> Result<(), SinkError>;

    fn sync(&mut self) -> Result<(), SinkError>;
}

/// Multi-touch uinput device (type B slot protocol).
pub struct UinputTouchSink {
    device: VirtualDevice,
    /// Events staged since the last sync. The uinput layer appends its
    /// own report separator per `emit`, so staging keeps one report per
    /// sync instead of one per axis.
    pending: Vec<InputEvent>,
}

impl UinputTouchSink {
    pub fn new(name: &str, width: i32, height: i32, slots: i32) -> Result<Self, SinkError> {
        let axes = [
            (AbsoluteAxisType::ABS_MT_SLOT, 0, slots - 1),
            (AbsoluteAxisType::ABS_MT_TRACKING_ID, -1, 65535),
            (AbsoluteAxisType::ABS_MT_POSITION_X, 0, width - 1),
            (AbsoluteAxisType::ABS_MT_POSITION_Y, 0, height - 1),
            (AbsoluteAxisType::ABS_MT_PRESSURE, 0, MAX_PRESSURE),
            (AbsoluteAxisType::ABS_MT_TOUCH_MAJOR, 0, MAX_PRESSURE),
        ];

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(SinkError::CreateDevice)?
            .name(name);
        for &(code, min, max) in &axes {
            let setup = UinputAbsSetup::new(code, AbsInfo::new(0, min, max, 0, 0, 1));
            builder = builder
                .with_absolute_axis(&setup)
                .map_err(SinkError::CreateDevice)?;
        }
        let device = builder.build().map_err(SinkError::CreateDevice)?;

        Ok(Self {
            device,
            pending: Vec::with_capacity(8),
        })
    }

    fn stage(&mut self, axis: AbsoluteAxisType, value: i32) {
        self.pending
            .push(InputEvent::new(EventType::ABSOLUTE, axis.0, value));
    }
}

impl TouchSink for UinputTouchSink {
    fn report_touch(
        &mut self,
        slot: i32,
        x: i32,
        y: i32,
        pressure: i32,
        active: bool,
    ) -> Result<(), SinkError> {
        self.stage(AbsoluteAxisType::ABS_MT_SLOT, slot);
        if active {
            self.stage(AbsoluteAxisType::ABS_MT_TRACKING_ID, slot);
            self.stage(AbsoluteAxisType::ABS_MT_POSITION_X, x);
            self.stage(AbsoluteAxisType::ABS_MT_POSITION_Y, y);
            self.stage(AbsoluteAxisType::ABS_MT_PRESSURE, pressure);
            self.stage(AbsoluteAxisType::ABS_MT_TOUCH_MAJOR, NOMINAL_TOUCH_MAJOR);
        } else {
            self.stage(AbsoluteAxisType::ABS_MT_TRACKING_ID, -1);
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let events = std::mem::take(&mut self.pending);
        self.device.emit(&events).map_err(SinkError::EmitEvent)
    }
}

/// Log-only sink for dry runs.
#[derive(Debug, Default)]
pub struct TraceSink;

impl TouchSink for TraceSink {
    fn report_touch(
        &mut self,
        slot: i32,
        x: i32,
        y: i32,
        pressure: i32,
        active: bool,
    ) -> Result<(), SinkError> {
        if active {
            tracing::info!(slot, x, y, pressure, "touch down");
        } else {
            tracing::info!(slot, "touch up");
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One recorded contact report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    pub slot: i32,
    pub x: i32,
    pub y: i32,
    pub pressure: i32,
    pub active: bool,
}

/// Sink that records emissions for assertions. Cloning shares the log,
/// so a clone can stay with the caller while the original is attached.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<Emission>>>,
    syncs: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.log.lock().clone()
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.log.lock().clear();
        self.syncs.store(0, Ordering::Relaxed);
    }
}

impl TouchSink for RecordingSink {
    fn report_touch(
        &mut self,
        slot: i32,
        x: i32,
        y: i32,
        pressure: i32,
        active: bool,
    ) -> Result<(), SinkError> {
        self.log.lock().push(Emission {
            slot,
            x,
            y,
            pressure,
            active,
        });
        Ok(())
    }

    fn sync(&mut self) -> Result<(), SinkError> {
        self.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

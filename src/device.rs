//! The touch device: state owner and entry points
//!
//! `TouchDevice` ties the configuration store, the activation link, the
//! counters and the injection engine together. The daemon feeds it raw
//! control frames through [`TouchDevice::write`] and keyboard events
//! through [`TouchDevice::handle_key_event`]; background tasks hold a
//! `Weak` reference and use [`TouchDevice::link`] and
//! [`TouchDevice::trim_stats`].

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use vtouch_protocol::{cmd, Frame, ProtocolError, HEADER_LEN, MAX_FRAME_LEN};

use crate::channel;
use crate::config::{DeviceConfig, StartupConfig};
use crate::error::DeviceError;
use crate::inject::Injector;
use crate::modes;
use crate::sink::TouchSink;
use crate::state::{LinkState, Stats, Tuning};

/// Fixed banner returned by the read path, independent of state.
pub const STATUS_BANNER: &str = "vtouch v1.0\nstatus: ok\n";

/// Command count above which the worker trims all counters.
pub const COMMAND_TRIM_THRESHOLD: u64 = 10_000;

pub struct TouchDevice {
    config: Mutex<DeviceConfig>,
    link: Arc<LinkState>,
    tuning: Arc<Tuning>,
    stats: Arc<Stats>,
    injector: Injector,
    fingerprint: [u8; 16],
}

impl TouchDevice {
    pub fn new(boot: &StartupConfig) -> Arc<Self> {
        let link = Arc::new(LinkState::new(boot.heartbeat_interval_secs));
        let tuning = Arc::new(Tuning::new(
            boot.screen_width,
            boot.screen_height,
            boot.jitter_range,
        ));
        let stats = Arc::new(Stats::default());
        let injector = Injector::new(Arc::clone(&tuning), Arc::clone(&link), Arc::clone(&stats));

        let fingerprint = crate::util::session_fingerprint(&mut rand::thread_rng());
        tracing::debug!(
            fingerprint = %hex(&fingerprint),
            mode = boot.mode.name(),
            "device initialized"
        );

        Arc::new(Self {
            config: Mutex::new(DeviceConfig::from_startup(boot)),
            link,
            tuning,
            stats,
            injector,
            fingerprint,
        })
    }

    /// Accept one raw control frame.
    ///
    /// Oversized writes are truncated to the maximum frame length.
    /// Validation failures reject the whole frame with no partial
    /// effect; on success the command counter ticks once and the
    /// consumed length is returned.
    pub fn write(&self, buf: &[u8]) -> Result<usize, DeviceError> {
        if buf.len() < HEADER_LEN {
            return Err(DeviceError::InvalidRequest(ProtocolError::TooShort {
                expected: HEADER_LEN,
                got: buf.len(),
            }));
        }
        let buf = &buf[..buf.len().min(MAX_FRAME_LEN)];
        let frame = Frame::parse(buf)?;
        let command = frame.cmd;

        {
            let mut cfg = self.config.lock();
            channel::dispatch(&mut cfg, &self.link, &self.tuning, &self.stats, frame)?;
        }
        self.stats.record_command();
        tracing::trace!(cmd = cmd::name(command), "command applied");
        Ok(buf.len())
    }

    /// Read the status banner. Only offset zero yields data, so a
    /// sequential reader sees the banner exactly once.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> usize {
        if offset > 0 {
            return 0;
        }
        let banner = STATUS_BANNER.as_bytes();
        let n = buf.len().min(banner.len());
        buf[..n].copy_from_slice(&banner[..n]);
        n
    }

    /// Feed one keyboard event through the mode controller.
    ///
    /// The gesture plan is computed under the config lock and executed
    /// after it is released, so emissions and dwell pauses never hold
    /// the lock.
    pub fn handle_key_event(&self, keycode: u32, pressed: bool) -> Result<(), DeviceError> {
        let plan = {
            let mut cfg = self.config.lock();
            modes::plan_key_event(&mut cfg, keycode, pressed)
        };
        self.injector.run_plan(&plan.steps)?;
        if plan.slides > 0 && self.link.is_activated() {
            for _ in 0..plan.slides {
                self.stats.record_slide();
            }
        }
        Ok(())
    }

    /// Reset all counters once the command count exceeds the trim
    /// threshold, serialized against dispatch by the config mutex.
    /// Returns whether a trim happened.
    pub fn trim_stats(&self) -> bool {
        if self.stats.commands() <= COMMAND_TRIM_THRESHOLD {
            return false;
        }
        let _guard = self.config.lock();
        self.stats.reset();
        tracing::debug!("activity counters trimmed");
        true
    }

    pub fn attach_sink(&self, sink: Box<dyn TouchSink>) {
        self.injector.attach_sink(sink);
    }

    pub fn config(&self) -> MutexGuard<'_, DeviceConfig> {
        self.config.lock()
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn fingerprint(&self) -> &[u8; 16] {
        &self.fingerprint
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtouch_protocol::build_frame;

    fn device() -> Arc<TouchDevice> {
        TouchDevice::new(&StartupConfig::default())
    }

    #[test]
    fn write_rejects_undersized_buffers() {
        let dev = device();
        for len in 0..HEADER_LEN {
            let err = dev.write(&vec![0u8; len]).unwrap_err();
            assert!(matches!(err, DeviceError::InvalidRequest(_)), "len {len}");
        }
        assert_eq!(dev.stats().snapshot().commands, 0);
    }

    #[test]
    fn write_returns_consumed_length() {
        let dev = device();
        let frame = build_frame(cmd::ACTIVATE, &[]);
        assert_eq!(dev.write(&frame).unwrap(), 7);
        assert!(dev.link().is_activated());
    }

    #[test]
    fn oversized_write_is_truncated() {
        // A valid 256-byte frame followed by garbage: the tail must not
        // reach validation.
        let dev = device();
        let mut frame = build_frame(cmd::HEARTBEAT, &[0u8; MAX_FRAME_LEN - HEADER_LEN]);
        assert_eq!(frame.len(), MAX_FRAME_LEN);
        frame.extend_from_slice(&[0xFF; 64]);
        assert_eq!(dev.write(&frame).unwrap(), MAX_FRAME_LEN);
    }

    #[test]
    fn read_returns_banner_once() {
        let dev = device();
        let mut buf = [0u8; 64];
        let n = dev.read(0, &mut buf);
        assert_eq!(&buf[..n], STATUS_BANNER.as_bytes());
        assert_eq!(dev.read(n as u64, &mut buf), 0);
    }

    #[test]
    fn short_read_truncates_banner() {
        let dev = device();
        let mut buf = [0u8; 6];
        let n = dev.read(0, &mut buf);
        assert_eq!(n, 6);
        assert_eq!(&buf, b"vtouch");
    }

    #[test]
    fn read_ignores_device_state() {
        let dev = device();
        dev.write(&build_frame(cmd::ACTIVATE, &[])).unwrap();
        let mut buf = [0u8; 64];
        let n = dev.read(0, &mut buf);
        assert_eq!(&buf[..n], STATUS_BANNER.as_bytes());
    }

    #[test]
    fn trim_stats_requires_threshold() {
        let dev = device();
        let frame = build_frame(cmd::HEARTBEAT, &[]);
        dev.write(&frame).unwrap();
        assert!(!dev.trim_stats());
        assert_eq!(dev.stats().snapshot().commands, 1);

        for _ in 0..COMMAND_TRIM_THRESHOLD {
            dev.stats().record_command();
        }
        assert!(dev.trim_stats());
        assert_eq!(dev.stats().snapshot().commands, 0);
    }
}

//! Heartbeat watchdog
//!
//! A one-second periodic check that expires the activation link when no
//! ACTIVATE/HEARTBEAT has refreshed it within the heartbeat interval.
//! The check touches only the atomic link snapshot and can never block
//! behind the dispatch mutex.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::TouchDevice;

pub const WATCHDOG_PERIOD: Duration = Duration::from_secs(1);

pub struct Watchdog {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn spawn(device: &Arc<TouchDevice>) -> io::Result<Self> {
        Self::spawn_with_period(device, WATCHDOG_PERIOD)
    }

    /// Period is configurable for tests; production uses one second.
    pub fn spawn_with_period(device: &Arc<TouchDevice>, period: Duration) -> io::Result<Self> {
        let weak: Weak<TouchDevice> = Arc::downgrade(device);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("vtouch-watchdog".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    let Some(device) = weak.upgrade() else {
                        tracing::debug!("device dropped, watchdog exiting");
                        return;
                    };
                    let link = device.link();
                    if link.expire_if_stale(link.now_ms()) {
                        tracing::info!("heartbeat lease expired, link deactivated");
                    }
                }
                tracing::debug!("watchdog stopped");
            })?;

        Ok(Self { handle, stop })
    }

    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StartupConfig;

    #[test]
    fn watchdog_exits_when_device_is_dropped() {
        let device = TouchDevice::new(&StartupConfig::default());
        let watchdog =
            Watchdog::spawn_with_period(&device, Duration::from_millis(5)).unwrap();
        drop(device);
        thread::sleep(Duration::from_millis(50));
        assert!(watchdog.handle.is_finished());
    }

    #[test]
    fn watchdog_stops_on_request() {
        let device = TouchDevice::new(&StartupConfig::default());
        let watchdog =
            Watchdog::spawn_with_period(&device, Duration::from_millis(5)).unwrap();
        watchdog.stop();
    }

    #[test]
    fn stale_link_is_expired() {
        let mut boot = StartupConfig::default();
        boot.heartbeat_interval_secs = 0; // expiry logic tested on LinkState
        let device = TouchDevice::new(&boot);
        let watchdog =
            Watchdog::spawn_with_period(&device, Duration::from_millis(5)).unwrap();
        device.link().activate(device.link().now_ms());
        thread::sleep(Duration::from_millis(30));
        // Interval zero disables expiry, so the link must survive ticks
        assert!(device.link().is_activated());
        watchdog.stop();
    }
}

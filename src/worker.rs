//! Background maintenance worker
//!
//! Wakes every 100 ms and trims the activity counters once the command
//! count runs past the threshold, keeping long sessions from carting
//! around unbounded totals.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::TouchDevice;

pub const WORKER_PERIOD: Duration = Duration::from_millis(100);

pub struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl Worker {
    pub fn spawn(device: &Arc<TouchDevice>) -> io::Result<Self> {
        Self::spawn_with_period(device, WORKER_PERIOD)
    }

    pub fn spawn_with_period(device: &Arc<TouchDevice>, period: Duration) -> io::Result<Self> {
        let weak: Weak<TouchDevice> = Arc::downgrade(device);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("vtouch-worker".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    let Some(device) = weak.upgrade() else {
                        tracing::debug!("device dropped, worker exiting");
                        return;
                    };
                    device.trim_stats();
                }
                tracing::debug!("worker stopped");
            })?;

        Ok(Self { handle, stop })
    }

    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

//! Injection engine: gating, clamping, jitter, emission
//!
//! Every synthesized contact goes through [`Injector::inject`], which
//! applies the activation gate, screen-bounds clamping and positional
//! jitter before handing the report to the attached sink.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::RngCore;

use crate::sink::{SinkError, TouchSink, MAX_PRESSURE};
use crate::state::{LinkState, Stats, Tuning};

/// One step of a planned gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Touch {
        slot: i32,
        x: i32,
        y: i32,
        pressure: i32,
    },
    Pause(Duration),
}

pub struct Injector {
    tuning: Arc<Tuning>,
    link: Arc<LinkState>,
    stats: Arc<Stats>,
    sink: Mutex<Option<Box<dyn TouchSink>>>,
}

impl Injector {
    pub fn new(tuning: Arc<Tuning>, link: Arc<LinkState>, stats: Arc<Stats>) -> Self {
        Self {
            tuning,
            link,
            stats,
            sink: Mutex::new(None),
        }
    }

    pub fn attach_sink(&self, sink: Box<dyn TouchSink>) {
        *self.sink.lock() = Some(sink);
    }

    pub fn has_sink(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Emit one contact change on `slot`.
    ///
    /// Silently a no-op while the link is deactivated or no sink is
    /// attached. Coordinates are clamped to the screen, pressure to
    /// [0, 255]. With a positive jitter range and a press, one random
    /// draw perturbs both axes before a re-clamp. Pressure zero lifts
    /// the contact. Every emission ends with a sync and counts as a
    /// move.
    pub fn inject(&self, slot: i32, x: i32, y: i32, pressure: i32) -> Result<(), SinkError> {
        if !self.link.is_activated() {
            return Ok(());
        }
        let mut guard = self.sink.lock();
        let Some(sink) = guard.as_mut() else {
            return Ok(());
        };

        let width = self.tuning.screen_width();
        let height = self.tuning.screen_height();
        let mut x = x.clamp(0, width - 1);
        let mut y = y.clamp(0, height - 1);
        let pressure = pressure.clamp(0, MAX_PRESSURE);

        let jitter = self.tuning.jitter_range();
        if jitter > 0 && pressure > 0 {
            // Both offsets come from a single draw: low bits drive x,
            // the next byte drives y.
            let draw = rand::thread_rng().next_u32();
            let span = (jitter as u32) * 2 + 1;
            let jx = (draw % span) as i32 - jitter;
            let jy = ((draw >> 8) % span) as i32 - jitter;
            x = (x + jx).clamp(0, width - 1);
            y = (y + jy).clamp(0, height - 1);
        }

        if pressure > 0 {
            sink.report_touch(slot, x, y, pressure, true)?;
        } else {
            sink.report_touch(slot, x, y, 0, false)?;
        }
        sink.sync()?;
        self.stats.record_move();
        Ok(())
    }

    /// Execute a planned gesture step by step.
    pub fn run_plan(&self, steps: &[Step]) -> Result<(), SinkError> {
        for step in steps {
            match *step {
                Step::Touch {
                    slot,
                    x,
                    y,
                    pressure,
                } => self.inject(slot, x, y, pressure)?,
                Step::Pause(duration) => std::thread::sleep(duration),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn test_injector(jitter: i32) -> (Injector, Arc<LinkState>, RecordingSink) {
        let tuning = Arc::new(Tuning::new(2800, 2000, jitter));
        let link = Arc::new(LinkState::new(30));
        let stats = Arc::new(Stats::default());
        let injector = Injector::new(tuning, Arc::clone(&link), stats);
        let sink = RecordingSink::new();
        injector.attach_sink(Box::new(sink.clone()));
        (injector, link, sink)
    }

    #[test]
    fn deactivated_link_suppresses_emission() {
        let (injector, link, sink) = test_injector(0);
        injector.inject(0, 100, 100, 128).unwrap();
        assert!(sink.emissions().is_empty());

        link.activate(0);
        injector.inject(0, 100, 100, 128).unwrap();
        assert_eq!(sink.emissions().len(), 1);
    }

    #[test]
    fn clamps_to_screen_bounds() {
        let (injector, link, sink) = test_injector(0);
        link.activate(0);
        injector.inject(0, 5000, -100, 128).unwrap();
        let log = sink.emissions();
        assert_eq!((log[0].x, log[0].y), (2799, 0));
    }

    #[test]
    fn clamps_pressure() {
        let (injector, link, sink) = test_injector(0);
        link.activate(0);
        injector.inject(0, 10, 10, 9000).unwrap();
        assert_eq!(sink.emissions()[0].pressure, 255);
    }

    #[test]
    fn release_ignores_jitter() {
        let (injector, link, sink) = test_injector(50);
        link.activate(0);
        injector.inject(2, 0, 0, 0).unwrap();
        let log = sink.emissions();
        assert_eq!(log.len(), 1);
        assert!(!log[0].active);
        assert_eq!(log[0].pressure, 0);
    }

    #[test]
    fn jitter_stays_within_range_and_bounds() {
        let (injector, link, sink) = test_injector(3);
        link.activate(0);
        for _ in 0..64 {
            injector.inject(0, 1400, 1000, 100).unwrap();
            injector.inject(0, 0, 0, 100).unwrap();
        }
        for report in sink.emissions() {
            assert!(report.x >= 0 && report.x < 2800);
            assert!(report.y >= 0 && report.y < 2000);
            // Around the center, jitter is at most ±3 per axis
            if report.x > 100 {
                assert!((report.x - 1400).abs() <= 3, "x = {}", report.x);
                assert!((report.y - 1000).abs() <= 3, "y = {}", report.y);
            } else {
                // Clamped corner: offsets can only push inward
                assert!(report.x <= 3 && report.y <= 3);
            }
        }
    }

    #[test]
    fn every_emission_syncs_and_counts() {
        let tuning = Arc::new(Tuning::new(2800, 2000, 0));
        let link = Arc::new(LinkState::new(30));
        let stats = Arc::new(Stats::default());
        let injector = Injector::new(tuning, Arc::clone(&link), Arc::clone(&stats));
        let sink = RecordingSink::new();
        injector.attach_sink(Box::new(sink.clone()));

        link.activate(0);
        injector.inject(1, 10, 10, 100).unwrap();
        injector.inject(1, 0, 0, 0).unwrap();
        assert_eq!(sink.sync_count(), 2);
        assert_eq!(stats.snapshot().moves, 2);
    }

    #[test]
    fn no_sink_is_a_silent_noop() {
        let tuning = Arc::new(Tuning::new(2800, 2000, 0));
        let link = Arc::new(LinkState::new(30));
        let stats = Arc::new(Stats::default());
        let injector = Injector::new(tuning, Arc::clone(&link), Arc::clone(&stats));
        link.activate(0);
        injector.inject(0, 10, 10, 100).unwrap();
        assert_eq!(stats.snapshot().moves, 0);
    }
}

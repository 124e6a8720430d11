//! Lock-free shared state: activation link, injection tuning, counters
//!
//! Activation and its timestamp were historically guarded by two
//! different locks on two different paths; here they live together as an
//! atomic snapshot so the watchdog can check and expire them without
//! ever blocking, while the command path serializes its writers behind
//! the dispatch mutex.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::time::Instant;

/// Activation link between the controlling client and the device.
#[derive(Debug)]
pub struct LinkState {
    activated: AtomicBool,
    /// Milliseconds on the device clock at the last ACTIVATE/HEARTBEAT.
    activate_time_ms: AtomicU64,
    heartbeat_interval_secs: AtomicU64,
    epoch: Instant,
}

impl LinkState {
    pub fn new(heartbeat_interval_secs: u64) -> Self {
        Self {
            activated: AtomicBool::new(false),
            activate_time_ms: AtomicU64::new(0),
            heartbeat_interval_secs: AtomicU64::new(heartbeat_interval_secs),
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since this link was created (the device clock).
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    pub fn activate(&self, now_ms: u64) {
        self.activate_time_ms.store(now_ms, Ordering::Release);
        self.activated.store(true, Ordering::Release);
    }

    pub fn deactivate(&self) {
        self.activated.store(false, Ordering::Release);
    }

    /// Refresh the liveness timestamp without changing activation.
    pub fn heartbeat(&self, now_ms: u64) {
        self.activate_time_ms.store(now_ms, Ordering::Release);
    }

    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval_secs.load(Ordering::Relaxed)
    }

    /// Deactivate if strictly more than the heartbeat interval has
    /// passed since the last ACTIVATE/HEARTBEAT. An interval of zero
    /// disables expiry. Returns whether the link was expired.
    pub fn expire_if_stale(&self, now_ms: u64) -> bool {
        if !self.is_activated() {
            return false;
        }
        let interval = self.heartbeat_interval_secs();
        if interval == 0 {
            return false;
        }
        let last = self.activate_time_ms.load(Ordering::Acquire);
        let idle = now_ms.saturating_sub(last);
        if idle > interval * 1000 {
            self.deactivate();
            return true;
        }
        false
    }
}

/// Injection tuning read on every emission; written by SET_CONFIG and
/// at startup.
#[derive(Debug)]
pub struct Tuning {
    screen_width: AtomicI32,
    screen_height: AtomicI32,
    jitter_range: AtomicI32,
}

impl Tuning {
    pub fn new(screen_width: i32, screen_height: i32, jitter_range: i32) -> Self {
        Self {
            screen_width: AtomicI32::new(screen_width),
            screen_height: AtomicI32::new(screen_height),
            jitter_range: AtomicI32::new(jitter_range),
        }
    }

    pub fn screen_width(&self) -> i32 {
        self.screen_width.load(Ordering::Relaxed)
    }

    pub fn screen_height(&self) -> i32 {
        self.screen_height.load(Ordering::Relaxed)
    }

    pub fn jitter_range(&self) -> i32 {
        self.jitter_range.load(Ordering::Relaxed)
    }

    pub fn set_jitter_range(&self, range: i32) {
        self.jitter_range.store(range, Ordering::Relaxed);
    }
}

/// Volatile activity counters, periodically trimmed by the worker.
#[derive(Debug, Default)]
pub struct Stats {
    moves: AtomicU64,
    clicks: AtomicU64,
    slides: AtomicU64,
    commands: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub moves: u64,
    pub clicks: u64,
    pub slides: u64,
    pub commands: u64,
}

impl Stats {
    pub fn record_move(&self) {
        self.moves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_click(&self) {
        self.clicks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_slide(&self) {
        self.slides.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.moves.store(0, Ordering::Relaxed);
        self.clicks.store(0, Ordering::Relaxed);
        self.slides.store(0, Ordering::Relaxed);
        self.commands.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            moves: self.moves.load(Ordering::Relaxed),
            clicks: self.clicks.load(Ordering::Relaxed),
            slides: self.slides.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_starts_deactivated() {
        let link = LinkState::new(30);
        assert!(!link.is_activated());
        assert!(!link.expire_if_stale(1_000_000));
    }

    #[test]
    fn link_expires_after_interval() {
        let link = LinkState::new(30);
        link.activate(0);
        assert!(link.is_activated());
        // 30s exactly is still within the interval (strict comparison)
        assert!(!link.expire_if_stale(30_000));
        assert!(link.is_activated());
        assert!(link.expire_if_stale(31_000));
        assert!(!link.is_activated());
    }

    #[test]
    fn heartbeat_extends_lease() {
        let link = LinkState::new(30);
        link.activate(0);
        link.heartbeat(20_000);
        assert!(!link.expire_if_stale(49_000));
        assert!(link.is_activated());
        assert!(link.expire_if_stale(50_001));
    }

    #[test]
    fn zero_interval_never_expires() {
        let link = LinkState::new(0);
        link.activate(0);
        assert!(!link.expire_if_stale(u64::MAX));
        assert!(link.is_activated());
    }

    #[test]
    fn heartbeat_alone_does_not_activate() {
        let link = LinkState::new(30);
        link.heartbeat(5_000);
        assert!(!link.is_activated());
    }

    #[test]
    fn stats_reset_clears_all() {
        let stats = Stats::default();
        stats.record_move();
        stats.record_click();
        stats.record_slide();
        stats.record_command();
        stats.record_command();
        let snap = stats.snapshot();
        assert_eq!((snap.moves, snap.clicks, snap.slides, snap.commands), (1, 1, 1, 2));
        stats.reset();
        let snap = stats.snapshot();
        assert_eq!((snap.moves, snap.clicks, snap.slides, snap.commands), (0, 0, 0, 0));
    }
}

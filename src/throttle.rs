//! Alert throttle: sliding-window rate limit plus single-flight gate.
//!
//! Noisy fall-detection hardware can report the same fall many times in a
//! row. The throttle admits a fall event only when
//!
//! 1. fewer than `max_alerts` cycles were triggered in the last
//!    `window_ms`, **and**
//! 2. no alert cycle is currently active.
//!
//! The first genuine fall is therefore never suppressed, while alert storms
//! are cut off after `max_alerts`.
//!
//! Ages are measured as an absolute difference, so a wall clock that steps
//! backwards still expires entries instead of pinning them forever.

use heapless::Deque;
use log::debug;

/// Static capacity of the timestamp window.
pub const WINDOW_CAPACITY: usize = 8;

/// Sliding-window trigger limiter.
#[derive(Debug, Clone)]
pub struct AlertThrottle {
    window_ms: u64,
    max_alerts: usize,
    stamps: Deque<u64, WINDOW_CAPACITY>,
}

impl AlertThrottle {
    /// `max_alerts` is clamped to `1..=WINDOW_CAPACITY`.
    pub fn new(window_ms: u64, max_alerts: u8) -> Self {
        Self {
            window_ms,
            max_alerts: (max_alerts as usize).clamp(1, WINDOW_CAPACITY),
            stamps: Deque::new(),
        }
    }

    /// Prune the window, then decide whether a new cycle may start.
    pub fn can_trigger(&mut self, now_ms: u64, cycle_active: bool) -> bool {
        self.prune(now_ms);
        let admitted = self.stamps.len() < self.max_alerts && !cycle_active;
        if !admitted {
            debug!(
                "throttle: rejected (recent={}, cap={}, active={})",
                self.stamps.len(),
                self.max_alerts,
                cycle_active
            );
        }
        admitted
    }

    /// Record an accepted trigger. Evicts the oldest entry when full.
    pub fn record_trigger(&mut self, now_ms: u64) {
        self.prune(now_ms);
        while self.stamps.len() >= self.max_alerts {
            self.stamps.pop_front();
        }
        // Cannot fail: the loop above leaves at least one free slot.
        let _ = self.stamps.push_back(now_ms);
    }

    /// Number of triggers still inside the window (as of the last prune).
    pub fn recent(&self) -> usize {
        self.stamps.len()
    }

    pub fn max_alerts(&self) -> usize {
        self.max_alerts
    }

    // ── Internal ──────────────────────────────────────────────

    fn prune(&mut self, now_ms: u64) {
        let mut kept: Deque<u64, WINDOW_CAPACITY> = Deque::new();
        for &ts in self.stamps.iter() {
            if now_ms.abs_diff(ts) < self.window_ms {
                let _ = kept.push_back(ts);
            }
        }
        self.stamps = kept;
    }
}

//! Runtime diagnostics.
//!
//! [`AlertStats`] counts what the core did, fed from the same event stream
//! the UI sees. [`ResultLog`] keeps the most recent dispatch reports in a
//! fixed-size ring, so a long-running session never grows it.
//!
//! Both are returned by the runtime when it stops, and the binary prints
//! them on exit.

use heapless::HistoryBuffer;
use serde::Serialize;

use crate::app::events::AlertEvent;
use crate::dispatch::{ChannelOutcome, DispatchReport};

/// Number of dispatch reports retained.
pub const RESULT_LOG_SLOTS: usize = 8;

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertStats {
    pub frames: u32,
    pub frames_dropped: u32,
    pub falls: u32,
    pub throttled: u32,
    pub needs_setup: u32,
    pub cycles_started: u32,
    pub cycles_cancelled: u32,
    pub cycles_completed: u32,
    pub channels_sent: u32,
    pub channels_skipped: u32,
    pub channels_failed: u32,
    pub link_losses: u32,
}

impl AlertStats {
    /// Update counters from one emitted event.
    pub fn observe(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::Telemetry(reading) => {
                self.frames += 1;
                if reading.fall_detected {
                    self.falls += 1;
                }
            }
            AlertEvent::FrameDropped(_) => self.frames_dropped += 1,
            AlertEvent::LinkLost => self.link_losses += 1,
            AlertEvent::Throttled => self.throttled += 1,
            AlertEvent::NeedsSetup => self.needs_setup += 1,
            AlertEvent::CycleStarted { .. } => self.cycles_started += 1,
            AlertEvent::CycleCancelled { .. } => self.cycles_cancelled += 1,
            AlertEvent::CycleCompleted { .. } => self.cycles_completed += 1,
            AlertEvent::ChannelResult { outcome, .. } => match outcome {
                ChannelOutcome::Sent => self.channels_sent += 1,
                ChannelOutcome::Skipped(_) => self.channels_skipped += 1,
                ChannelOutcome::Failed(_) => self.channels_failed += 1,
            },
            AlertEvent::Started(_)
            | AlertEvent::StateChanged { .. }
            | AlertEvent::CountdownProgress { .. }
            | AlertEvent::DispatchFinished { .. } => {}
        }
    }
}

/// Ring of the last [`RESULT_LOG_SLOTS`] dispatch reports.
#[derive(Default)]
pub struct ResultLog {
    reports: HistoryBuffer<DispatchReport, RESULT_LOG_SLOTS>,
    total: u32,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a report, overwriting the oldest when full.
    pub fn push(&mut self, report: DispatchReport) {
        self.reports.write(report);
        self.total += 1;
    }

    /// Most recent report.
    pub fn latest(&self) -> Option<&DispatchReport> {
        self.reports.recent()
    }

    /// Retained reports, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DispatchReport> {
        self.reports.oldest_ordered()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.len() == 0
    }

    /// Reports pushed since startup, including overwritten ones.
    pub fn total(&self) -> u32 {
        self.total
    }
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every [`AlertEvent`] as one tagged
//! line through the `log` facade. A dashboard adapter would implement the
//! same trait.

use log::{info, warn};

use crate::app::events::AlertEvent;
use crate::app::ports::EventSink;
use crate::dispatch::ChannelOutcome;
use crate::location::Resolution;

/// Adapter that logs every [`AlertEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::Telemetry(t) => {
                let loc = match t.location {
                    Some(fix) => format!("{:.5},{:.5}", fix.lat, fix.lng),
                    None => "-".to_string(),
                };
                info!(
                    "TELEM | HR={}bpm | steps={} | fall={} | loc={}",
                    t.heart_rate_bpm,
                    t.step_count,
                    if t.fall_detected { "YES" } else { "no" },
                    loc,
                );
            }
            AlertEvent::FrameDropped(e) => {
                warn!("TELEM | dropped: {}", e);
            }
            AlertEvent::LinkLost => {
                warn!("LINK  | device connection lost");
            }
            AlertEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AlertEvent::Throttled => {
                info!("ALERT | fall suppressed by throttle");
            }
            AlertEvent::NeedsSetup => {
                warn!("ALERT | fall detected but no caregiver set (run `set-caregiver`)");
            }
            AlertEvent::CycleStarted { cycle, countdown_secs } => {
                info!("ALERT | cycle {} started, {}s to cancel", cycle, countdown_secs);
            }
            AlertEvent::CountdownProgress { cycle, remaining_secs } => {
                info!("COUNT | cycle {} | {}", cycle, remaining_secs);
            }
            AlertEvent::CycleCancelled { cycle, remaining_secs } => {
                info!("ALERT | cycle {} cancelled ({}s left)", cycle, remaining_secs);
            }
            AlertEvent::CycleCompleted { cycle, location, grace_ms } => {
                let loc = match location {
                    Resolution::Fix(fix, source) => {
                        format!("{:.5},{:.5} ({:?})", fix.lat, fix.lng, source)
                    }
                    Resolution::Unavailable => "unavailable".to_string(),
                };
                info!("ALERT | cycle {} sent | location={} | grace={}ms", cycle, loc, grace_ms);
            }
            AlertEvent::ChannelResult { cycle, channel, outcome } => match outcome {
                ChannelOutcome::Sent => info!("CHAN  | {} | {} ok", cycle, channel),
                ChannelOutcome::Skipped(why) => {
                    info!("CHAN  | {} | {} skipped: {}", cycle, channel, why)
                }
                ChannelOutcome::Failed(e) => warn!("CHAN  | {} | {} FAILED: {}", cycle, channel, e),
            },
            AlertEvent::DispatchFinished { cycle, sent, skipped, failed } => {
                info!(
                    "DONE  | {} | sent={} skipped={} failed={}",
                    cycle, sent, skipped, failed
                );
            }
            AlertEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}

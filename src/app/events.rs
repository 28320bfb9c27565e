//! Outbound application events.
//!
//! The [`AlertService`](super::service::AlertService) and the runtime emit
//! these through the [`EventSink`](super::ports::EventSink) port. Adapters
//! on the other side decide what to do with them: log them, drive a
//! dashboard, or record them in a test.

use crate::dispatch::{ChannelKind, ChannelOutcome};
use crate::error::IngestError;
use crate::fsm::StateId;
use crate::location::Resolution;
use crate::telemetry::TelemetryReading;

use super::cycle::CycleId;

/// Structured events emitted by the alert core.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    /// The service has started (carries initial state).
    Started(StateId),

    /// A telemetry frame was decoded (dashboard values).
    Telemetry(TelemetryReading),

    /// A telemetry frame was dropped.
    FrameDropped(IngestError),

    /// The device link dropped.
    LinkLost,

    /// The orchestrator transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A fall was reported but the throttle refused a new cycle.
    Throttled,

    /// A fall was reported but no caregiver is configured.
    NeedsSetup,

    CycleStarted { cycle: CycleId, countdown_secs: u8 },

    /// Seconds left in the cancel window.
    CountdownProgress { cycle: CycleId, remaining_secs: u8 },

    CycleCancelled { cycle: CycleId, remaining_secs: u8 },

    /// The order left the orchestrator. `grace_ms` is how long the UI may
    /// keep showing the completion state.
    CycleCompleted {
        cycle: CycleId,
        location: Resolution,
        grace_ms: u32,
    },

    /// One channel finished.
    ChannelResult {
        cycle: CycleId,
        channel: ChannelKind,
        outcome: ChannelOutcome,
    },

    /// Every channel of a dispatch finished.
    DispatchFinished {
        cycle: CycleId,
        sent: usize,
        skipped: usize,
        failed: usize,
    },
}

//! Application service: the hexagonal core.
//!
//! [`AlertService`] owns the countdown FSM, the throttle, and the single
//! active [`AlertCycle`]. Every state change is an explicit call:
//! [`on_telemetry`](AlertService::on_telemetry), [`tick`](AlertService::tick),
//! [`cancel`](AlertService::cancel) and
//! [`location_resolved`](AlertService::location_resolved). Nothing in
//! here awaits; the runtime turns timers and I/O into these calls.
//!
//! ```text
//!  Telemetry ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!  Tick/Cancel ─▶│      AlertService       │
//!  Location ────▶│ Throttle · FSM · Cycle  │ ──▶ DispatchOrder
//!                └─────────────────────────┘
//!                         ▲
//!                    ProfilePort
//! ```

use log::{debug, info, warn};

use crate::config::AlertConfig;
use crate::fsm::context::{CycleInput, CycleOutputs, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::location::Resolution;
use crate::telemetry::{GeoFix, TelemetryReading};
use crate::throttle::AlertThrottle;

use super::cycle::{AlertCycle, CycleId, CycleState, DispatchOrder};
use super::events::AlertEvent;
use super::ports::{EventSink, ProfilePort};

/// What happened to one telemetry reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallOutcome {
    /// No fall in this reading.
    Ignored,
    /// Fall dropped by the rate limit or because a cycle is active.
    Throttled,
    /// Fall dropped because no caregiver is configured.
    NeedsSetup,
    Started(CycleId),
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belongs to a cycle that is no longer counting.
    Stale,
    /// Seconds remaining.
    Counting(u8),
    /// The counter hit zero; a location is needed.
    Expired,
}

// ───────────────────────────────────────────────────────────────
// AlertService
// ───────────────────────────────────────────────────────────────

pub struct AlertService {
    fsm: Fsm,
    ctx: FsmContext,
    throttle: AlertThrottle,
    cycle: Option<AlertCycle>,
    next_cycle: u32,
    /// Latest telemetry position and when it arrived.
    last_fix: Option<(GeoFix, u64)>,
}

impl AlertService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: AlertConfig) -> Self {
        let throttle = AlertThrottle::new(config.throttle_window_ms, config.throttle_max_alerts);
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(config),
            throttle,
            cycle: None,
            next_cycle: 1,
            last_fix: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.ctx.drain_outputs();
        sink.emit(&AlertEvent::Started(self.fsm.current_state()));
        info!("AlertService started in {:?}", self.fsm.current_state());
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Process one decoded reading received at `now_ms`.
    ///
    /// The profile is only loaded when a fall passes the throttle, and is
    /// snapshotted into the new cycle.
    pub fn on_telemetry(
        &mut self,
        reading: TelemetryReading,
        now_ms: u64,
        profiles: &impl ProfilePort,
        sink: &mut impl EventSink,
    ) -> FallOutcome {
        sink.emit(&AlertEvent::Telemetry(reading));
        if let Some(fix) = reading.location {
            self.last_fix = Some((fix, now_ms));
        }

        if !reading.fall_detected {
            return FallOutcome::Ignored;
        }
        info!("Fall reported by device");

        if !self.throttle.can_trigger(now_ms, self.is_active()) {
            info!("Fall suppressed (active={}, recent={})", self.is_active(), self.throttle.recent());
            sink.emit(&AlertEvent::Throttled);
            return FallOutcome::Throttled;
        }

        let profile = match profiles.load() {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!("Fall detected but no caregiver configured");
                sink.emit(&AlertEvent::NeedsSetup);
                return FallOutcome::NeedsSetup;
            }
            Err(e) => {
                warn!("Fall detected but caregiver profile unreadable: {}", e);
                sink.emit(&AlertEvent::NeedsSetup);
                return FallOutcome::NeedsSetup;
            }
        };

        self.throttle.record_trigger(now_ms);
        let id = CycleId(self.next_cycle);
        self.next_cycle = self.next_cycle.wrapping_add(1);
        self.cycle = Some(AlertCycle {
            id,
            triggered_at_ms: now_ms,
            state: CycleState::Countdown,
            profile,
            location: None,
        });

        let prev = self.fsm.current_state();
        self.fsm.force_transition(StateId::Countdown, &mut self.ctx);
        sink.emit(&AlertEvent::StateChanged {
            from: prev,
            to: StateId::Countdown,
        });
        sink.emit(&AlertEvent::CycleStarted {
            cycle: id,
            countdown_secs: self.ctx.config.countdown_secs,
        });
        let outputs = self.ctx.drain_outputs();
        self.publish_progress(&outputs, sink);

        FallOutcome::Started(id)
    }

    /// One second of countdown for `cycle`.
    pub fn tick(&mut self, cycle: CycleId, sink: &mut impl EventSink) -> TickOutcome {
        if !self.is_counting(cycle) {
            debug!("Stale tick for cycle {}", cycle);
            return TickOutcome::Stale;
        }

        self.step(CycleInput::Tick, sink);

        if self.fsm.current_state() == StateId::Dispatching {
            if let Some(c) = self.cycle.as_mut() {
                c.state = CycleState::Dispatching;
            }
            TickOutcome::Expired
        } else {
            TickOutcome::Counting(self.ctx.remaining_secs)
        }
    }

    /// User cancel. Returns `true` if a countdown was stopped.
    pub fn cancel(&mut self, sink: &mut impl EventSink) -> bool {
        let remaining = self.ctx.remaining_secs;
        let outputs = self.step(CycleInput::Cancel, sink);

        if !outputs.cancelled {
            match self.fsm.current_state() {
                StateId::Dispatching => info!("Cancel ignored: alert already dispatching"),
                _ => info!("Cancel ignored: no active alert"),
            }
            return false;
        }

        if let Some(mut cycle) = self.cycle.take() {
            cycle.state = CycleState::Cancelled;
            info!("Cycle {} cancelled with {}s remaining", cycle.id, remaining);
            sink.emit(&AlertEvent::CycleCancelled {
                cycle: cycle.id,
                remaining_secs: remaining,
            });
        }
        true
    }

    /// The location for `cycle` is known. Completes the cycle, releases
    /// the lock, and hands back the order to dispatch.
    pub fn location_resolved(
        &mut self,
        cycle: CycleId,
        location: Resolution,
        sink: &mut impl EventSink,
    ) -> Option<DispatchOrder> {
        let current = self
            .cycle
            .as_ref()
            .filter(|c| c.id == cycle && c.state == CycleState::Dispatching);
        if current.is_none() {
            warn!("Location for cycle {} arrived with no matching dispatch", cycle);
            return None;
        }

        self.step(CycleInput::LocationReady, sink);

        let mut done = self.cycle.take()?;
        done.state = CycleState::Completed;
        done.location = Some(location);
        info!("Cycle {} handed off for dispatch", done.id);
        sink.emit(&AlertEvent::CycleCompleted {
            cycle: done.id,
            location,
            grace_ms: self.ctx.config.completion_grace_ms,
        });

        Some(DispatchOrder {
            cycle: done.id,
            triggered_at_ms: done.triggered_at_ms,
            profile: done.profile,
            location,
        })
    }

    /// The device link dropped. The telemetry position is no longer
    /// current; an active cycle carries on.
    pub fn link_lost(&mut self, sink: &mut impl EventSink) {
        self.last_fix = None;
        warn!("Device link lost");
        sink.emit(&AlertEvent::LinkLost);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// A cycle holds the single-flight lock.
    pub fn is_active(&self) -> bool {
        self.cycle.as_ref().is_some_and(|c| c.state.is_active())
    }

    /// `cycle` is the one currently counting down.
    pub fn is_counting(&self, cycle: CycleId) -> bool {
        self.cycle
            .as_ref()
            .is_some_and(|c| c.id == cycle && c.state == CycleState::Countdown)
    }

    pub fn active_cycle(&self) -> Option<&AlertCycle> {
        self.cycle.as_ref()
    }

    pub fn remaining_secs(&self) -> u8 {
        self.ctx.remaining_secs
    }

    pub fn latest_fix(&self) -> Option<(GeoFix, u64)> {
        self.last_fix
    }

    /// Triggers currently counted by the throttle window.
    pub fn recent_triggers(&self) -> usize {
        self.throttle.recent()
    }

    pub fn config(&self) -> &AlertConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// Feed one input through the FSM and publish what it produced.
    fn step(&mut self, input: CycleInput, sink: &mut impl EventSink) -> CycleOutputs {
        let prev = self.fsm.current_state();
        self.ctx.input = Some(input);
        self.fsm.tick(&mut self.ctx);
        let outputs = self.ctx.drain_outputs();

        self.publish_progress(&outputs, sink);
        let now = self.fsm.current_state();
        if now != prev {
            sink.emit(&AlertEvent::StateChanged { from: prev, to: now });
        }
        outputs
    }

    fn publish_progress(&self, outputs: &CycleOutputs, sink: &mut impl EventSink) {
        if let (Some(remaining), Some(cycle)) = (outputs.progress, self.cycle.as_ref()) {
            sink.emit(&AlertEvent::CountdownProgress {
                cycle: cycle.id,
                remaining_secs: remaining,
            });
        }
    }
}

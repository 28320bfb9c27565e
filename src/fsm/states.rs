//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers. No closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[qualifying fall]──▶ COUNTDOWN ──[cancel]──▶ IDLE
//!    ▲                             │
//!    │                       [counter hits 0]
//!    │                             ▼
//!    └──────[location ready]── DISPATCHING
//! ```
//!
//! `Idle → Countdown` is always a forced transition from the service,
//! which owns the throttle and the profile check.

use super::context::{CycleInput, FsmContext};
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Countdown
        StateDescriptor {
            name: "Countdown",
            on_enter: Some(countdown_enter),
            on_exit: Some(countdown_exit),
            on_update: countdown_update,
        },
        // Index 2: Dispatching
        StateDescriptor {
            name: "Dispatching",
            on_enter: Some(dispatching_enter),
            on_exit: None,
            on_update: dispatching_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.remaining_secs = 0;
    info!("IDLE: monitoring telemetry");
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(input) = ctx.input.take() {
        ctx.outputs.ignored = Some(input);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  COUNTDOWN state: cancel window before anything leaves the device
// ═══════════════════════════════════════════════════════════════════════════

fn countdown_enter(ctx: &mut FsmContext) {
    ctx.remaining_secs = ctx.config.countdown_secs;
    ctx.outputs.progress = Some(ctx.remaining_secs);
    info!("COUNTDOWN: {}s to cancel", ctx.remaining_secs);
}

fn countdown_exit(ctx: &mut FsmContext) {
    ctx.remaining_secs = 0;
}

fn countdown_update(ctx: &mut FsmContext) -> Option<StateId> {
    match ctx.input.take() {
        Some(CycleInput::Tick) => {
            ctx.remaining_secs = ctx.remaining_secs.saturating_sub(1);
            ctx.outputs.progress = Some(ctx.remaining_secs);
            if ctx.remaining_secs == 0 {
                info!("COUNTDOWN: expired → dispatching");
                return Some(StateId::Dispatching);
            }
            None
        }
        Some(CycleInput::Cancel) => {
            info!(
                "COUNTDOWN: cancelled with {}s remaining",
                ctx.remaining_secs
            );
            ctx.outputs.cancelled = true;
            Some(StateId::Idle)
        }
        Some(other) => {
            ctx.outputs.ignored = Some(other);
            None
        }
        None => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISPATCHING state: waiting for a location before hand-off
// ═══════════════════════════════════════════════════════════════════════════

fn dispatching_enter(ctx: &mut FsmContext) {
    ctx.outputs.request_location = true;
    info!("DISPATCHING: resolving location");
}

fn dispatching_update(ctx: &mut FsmContext) -> Option<StateId> {
    match ctx.input.take() {
        Some(CycleInput::LocationReady) => Some(StateId::Idle),
        Some(CycleInput::Cancel) => {
            warn!("DISPATCHING: cancel ignored, alert already committed");
            ctx.outputs.ignored = Some(CycleInput::Cancel);
            None
        }
        Some(other) => {
            ctx.outputs.ignored = Some(other);
            None
        }
        None => None,
    }
}

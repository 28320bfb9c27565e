//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard the countdown handlers read from and
//! write to: the pending input for this step, the countdown counter, the
//! outputs the service turns into events, and the configuration.

use crate::config::AlertConfig;

// ---------------------------------------------------------------------------
// Inputs (written by the service before each step)
// ---------------------------------------------------------------------------

/// One stimulus for the cycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleInput {
    /// One second of countdown elapsed.
    Tick,
    /// The user cancelled the alert.
    Cancel,
    /// The location resolver finished for the current cycle.
    LocationReady,
}

// ---------------------------------------------------------------------------
// Outputs (written by state handlers; drained by the service)
// ---------------------------------------------------------------------------

/// Side effects requested by handlers during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutputs {
    /// Countdown value to publish as a progress event.
    pub progress: Option<u8>,
    /// The runtime should start resolving a location.
    pub request_location: bool,
    /// The countdown was cancelled during this step.
    pub cancelled: bool,
    /// An input arrived in a state that does not accept it.
    pub ignored: Option<CycleInput>,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Countdown --
    /// Seconds left before dispatch. Zero outside `Countdown`.
    pub remaining_secs: u8,

    // -- I/O --
    /// Input consumed by the next `on_update`.
    pub input: Option<CycleInput>,
    pub outputs: CycleOutputs,

    // -- Configuration --
    pub config: AlertConfig,
}

impl FsmContext {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            remaining_secs: 0,
            input: None,
            outputs: CycleOutputs::default(),
            config,
        }
    }

    /// Take the outputs accumulated since the last drain.
    pub fn drain_outputs(&mut self) -> CycleOutputs {
        core::mem::take(&mut self.outputs)
    }
}

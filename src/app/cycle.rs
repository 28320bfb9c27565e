//! Alert cycle records.
//!
//! An [`AlertCycle`] lives from the qualifying fall until hand-off or
//! cancel. The service holds at most one; the [`DispatchOrder`] is what
//! survives it.

use core::fmt;

use crate::location::Resolution;
use crate::profile::CaregiverProfile;

/// Monotonic cycle identifier. Ticks and location results carry it so
/// stale work from an earlier cycle can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub u32);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Countdown,
    Cancelled,
    Dispatching,
    Completed,
}

impl CycleState {
    /// Holds the single-flight lock.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Countdown | Self::Dispatching)
    }
}

/// One countdown-through-dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCycle {
    pub id: CycleId,
    pub triggered_at_ms: u64,
    pub state: CycleState,
    /// Snapshot taken when the cycle started.
    pub profile: CaregiverProfile,
    pub location: Option<Resolution>,
}

/// Everything the dispatcher needs, detached from the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOrder {
    pub cycle: CycleId,
    pub triggered_at_ms: u64,
    pub profile: CaregiverProfile,
    pub location: Resolution,
}

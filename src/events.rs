//! Runtime event bus.
//!
//! Events are produced by:
//! - the ingest task (decoded frames, cancel presses, link drops)
//! - the ticker task (one countdown step per tick interval)
//! - the locator task (location results)
//! - the dispatcher task (finished reports)
//!
//! They are consumed by the control loop, the only code that mutates the
//! [`AlertService`](crate::app::service::AlertService), strictly in
//! arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Ingest      │────▶│              │     │              │
//! │ Ticker      │────▶│  Event Bus   │────▶│ Control Loop │
//! │ Locator     │────▶│  (bounded)   │     │  (consumer)  │
//! │ Dispatcher  │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;

use crate::app::cycle::CycleId;
use crate::dispatch::DispatchReport;
use crate::error::IngestError;
use crate::location::Resolution;
use crate::telemetry::TelemetryReading;

/// Maximum number of pending events.
pub const BUS_DEPTH: usize = 16;

/// Everything the control loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // ── Device / operator ─────────────────────────────────
    /// A decoded reading and the time it arrived.
    Telemetry { reading: TelemetryReading, at_ms: u64 },
    FrameDropped(IngestError),
    Cancel,
    LinkLost,
    /// The telemetry source is exhausted; stop once idle.
    SourceClosed,

    // ── Timers ────────────────────────────────────────────
    Tick(CycleId),

    // ── Work results ──────────────────────────────────────
    LocationResolved(CycleId, Resolution),
    DispatchFinished(DispatchReport),
}

/// Single-threaded bounded MPSC bus. Every task lives on one executor, so
/// no locking is needed.
pub type Bus = Channel<NoopRawMutex, Event, BUS_DEPTH>;

//! Cooperative runtime: wires the core to the host ports.
//!
//! Runs on the calling thread using `edge-executor` for cooperative
//! multi-task scheduling. Timers come from the [`TimePort`], which the
//! host backs with `async-io-mini`. Four detached tasks feed one control
//! loop over a bounded bus:
//!
//! 1. **Ingest**: pulls frames from the [`TelemetrySource`]
//! 2. **Ticker**: woken when a countdown starts, emits one tick per
//!    interval while that cycle is still counting
//! 3. **Locator**: woken when a countdown expires, resolves a location
//! 4. **Dispatcher**: receives orders, fans them out, reports back
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  futures_lite::future::block_on                              │
//!  │  ┌────────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                          │  │
//!  │  │                                                        │  │
//!  │  │  ┌────────┐ ┌────────┐ ┌─────────┐ ┌────────────┐      │  │
//!  │  │  │ Ingest │ │ Ticker │ │ Locator │ │ Dispatcher │      │  │
//!  │  │  └───┬────┘ └───┬────┘ └────┬────┘ └─────┬──────┘      │  │
//!  │  │      └──────────┴─── Bus ───┴────────────┘             │  │
//!  │  │                       ▼                                │  │
//!  │  │                 Control loop ──▶ AlertService          │  │
//!  │  └────────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The control loop is the only mutator of the service and never holds a
//! borrow across an `.await`. Cancel and tick share the bus, so a cancel
//! is always handled before any tick queued after it, and ticks carry the
//! cycle id so late ones are recognised and dropped.

use core::cell::RefCell;
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, info, warn};

use crate::app::cycle::{CycleId, DispatchOrder};
use crate::app::events::AlertEvent;
use crate::app::ports::{EventSink, Platform, ProfilePort, SourceFrame, TelemetrySource, TimePort};
use crate::app::service::{AlertService, FallOutcome, TickOutcome};
use crate::config::AlertConfig;
use crate::diagnostics::{AlertStats, ResultLog};
use crate::dispatch::Dispatcher;
use crate::events::{Bus, Event};
use crate::location::LocationResolver;
use crate::telemetry::{self, GeoFix};

/// Orders waiting for the dispatcher.
const ORDER_DEPTH: usize = 4;

type Orders = Channel<NoopRawMutex, DispatchOrder, ORDER_DEPTH>;
type CountdownSignal = Signal<NoopRawMutex, CycleId>;
type LocateSignal = Signal<NoopRawMutex, (CycleId, Option<(GeoFix, u64)>)>;

/// What a finished run leaves behind.
pub struct RunSummary {
    pub stats: AlertStats,
    pub results: ResultLog,
}

// ── Stats tee ────────────────────────────────────────────────

/// Forwards every event to the caller's sink after counting it.
struct Observed<'a, E> {
    stats: &'a mut AlertStats,
    inner: &'a mut E,
}

impl<E: EventSink> EventSink for Observed<'_, E> {
    fn emit(&mut self, event: &AlertEvent) {
        self.stats.observe(event);
        self.inner.emit(event);
    }
}

// ── Tasks ────────────────────────────────────────────────────

/// Ingest task: decodes frames and forwards them in order.
async fn ingest_loop<S: TelemetrySource>(mut source: S, bus: &Bus, clock: &impl TimePort) {
    while let Some(frame) = source.next_frame().await {
        let event = match frame {
            SourceFrame::Payload(bytes) => match telemetry::decode(&bytes) {
                Ok(reading) => Event::Telemetry {
                    reading,
                    at_ms: clock.now_ms(),
                },
                Err(e) => Event::FrameDropped(e),
            },
            SourceFrame::Cancel => Event::Cancel,
            SourceFrame::LinkLost => Event::LinkLost,
        };
        bus.send(event).await;
    }
    info!("ingest: source closed");
    bus.send(Event::SourceClosed).await;
}

/// Ticker task: one tick per interval for the counting cycle.
///
/// A new countdown signal preempts the current interval, so a fresh cycle
/// always gets full-length steps.
async fn ticker_loop(
    service: &RefCell<AlertService>,
    started: &CountdownSignal,
    bus: &Bus,
    clock: &impl TimePort,
    interval: Duration,
) {
    let mut cycle = started.wait().await;
    loop {
        let next = future::or(
            async {
                clock.sleep(interval).await;
                None
            },
            async { Some(started.wait().await) },
        )
        .await;

        match next {
            Some(newer) => cycle = newer,
            None => {
                let counting = service.borrow().is_counting(cycle);
                if counting {
                    bus.send(Event::Tick(cycle)).await;
                } else {
                    debug!("ticker: cycle {} no longer counting", cycle);
                    cycle = started.wait().await;
                }
            }
        }
    }
}

/// Locator task: resolves a location for each expired countdown.
async fn locator_loop<P: Platform>(
    requests: &LocateSignal,
    resolver: &LocationResolver,
    bus: &Bus,
    platform: &P,
) {
    loop {
        let (cycle, latest) = requests.wait().await;
        let resolution = resolver.resolve(latest, platform).await;
        bus.send(Event::LocationResolved(cycle, resolution)).await;
    }
}

/// Dispatcher task: runs one fan-out at a time, off the control loop.
async fn dispatch_loop<P: Platform>(
    orders: &Orders,
    dispatcher: &Dispatcher,
    bus: &Bus,
    platform: &P,
) {
    loop {
        let order = orders.receive().await;
        let report = dispatcher.dispatch(&order, platform).await;
        bus.send(Event::DispatchFinished(report)).await;
    }
}

// ── Control loop ─────────────────────────────────────────────

struct Wiring<'a> {
    bus: &'a Bus,
    countdown: &'a CountdownSignal,
    locate: &'a LocateSignal,
    orders: &'a Orders,
}

async fn control_loop<R: ProfilePort, E: EventSink>(
    service: &RefCell<AlertService>,
    wiring: Wiring<'_>,
    profiles: &R,
    sink: &mut E,
) -> RunSummary {
    let mut stats = AlertStats::default();
    let mut results = ResultLog::new();
    let mut closing = false;
    let mut in_flight = 0usize;

    service.borrow_mut().start(&mut Observed {
        stats: &mut stats,
        inner: &mut *sink,
    });

    loop {
        if closing && in_flight == 0 && !service.borrow().is_active() {
            info!("runtime: source closed and no alert pending, stopping");
            break;
        }

        let event = wiring.bus.receive().await;
        debug!("bus: {:?}", event);
        let mut out = Observed {
            stats: &mut stats,
            inner: &mut *sink,
        };

        match event {
            Event::Telemetry { reading, at_ms } => {
                let outcome = service
                    .borrow_mut()
                    .on_telemetry(reading, at_ms, profiles, &mut out);
                if let FallOutcome::Started(cycle) = outcome {
                    wiring.countdown.signal(cycle);
                }
            }
            Event::FrameDropped(e) => {
                warn!("ingest: dropping frame: {}", e);
                out.emit(&AlertEvent::FrameDropped(e));
            }
            Event::Cancel => {
                service.borrow_mut().cancel(&mut out);
            }
            Event::LinkLost => service.borrow_mut().link_lost(&mut out),
            Event::SourceClosed => closing = true,
            Event::Tick(cycle) => {
                let outcome = service.borrow_mut().tick(cycle, &mut out);
                if outcome == TickOutcome::Expired {
                    let latest = service.borrow().latest_fix();
                    wiring.locate.signal((cycle, latest));
                }
            }
            Event::LocationResolved(cycle, resolution) => {
                let order = service
                    .borrow_mut()
                    .location_resolved(cycle, resolution, &mut out);
                if let Some(order) = order {
                    in_flight += 1;
                    wiring.orders.send(order).await;
                }
            }
            Event::DispatchFinished(report) => {
                in_flight = in_flight.saturating_sub(1);
                for &(channel, outcome) in report.outcomes.iter() {
                    out.emit(&AlertEvent::ChannelResult {
                        cycle: report.cycle,
                        channel,
                        outcome,
                    });
                }
                out.emit(&AlertEvent::DispatchFinished {
                    cycle: report.cycle,
                    sent: report.sent(),
                    skipped: report.skipped(),
                    failed: report.failed(),
                });
                results.push(report);
            }
        }
    }

    RunSummary { stats, results }
}

// ── Entry point ──────────────────────────────────────────────

/// Run the alert core until `source` is exhausted and every pending
/// alert has been dispatched.
///
/// Blocks the calling thread. `platform` satisfies every outbound port;
/// `profiles` is read whenever a fall passes the throttle, so profile
/// edits apply to the next cycle.
pub fn run<S, P, R, E>(
    config: AlertConfig,
    source: S,
    platform: &P,
    profiles: &R,
    sink: &mut E,
) -> RunSummary
where
    S: TelemetrySource,
    P: Platform,
    R: ProfilePort,
    E: EventSink,
{
    let interval = Duration::from_millis(config.tick_interval_ms as u64);
    let resolver = LocationResolver::new(&config);
    let dispatcher = Dispatcher::new(&config);
    let service = RefCell::new(AlertService::new(config));

    let bus = Bus::new();
    let countdown = CountdownSignal::new();
    let locate = LocateSignal::new();
    let orders = Orders::new();

    // Declared last so it drops before the state its tasks borrow.
    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    executor.spawn(ingest_loop(source, &bus, platform)).detach();
    executor
        .spawn(ticker_loop(&service, &countdown, &bus, platform, interval))
        .detach();
    executor
        .spawn(locator_loop(&locate, &resolver, &bus, platform))
        .detach();
    executor
        .spawn(dispatch_loop(&orders, &dispatcher, &bus, platform))
        .detach();

    info!("runtime started (tick every {:?})", interval);

    let wiring = Wiring {
        bus: &bus,
        countdown: &countdown,
        locate: &locate,
        orders: &orders,
    };
    future::block_on(executor.run(control_loop(&service, wiring, profiles, sink)))
}

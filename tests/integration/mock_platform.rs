//! Mock host for integration tests.
//!
//! Records every notification, relay request and deep link so tests can
//! assert on the full channel history without a network or a desktop.
//! The clock is either virtual (sleeps advance it instantly) or real
//! (sleeps use `async-io-mini` timers) for the runtime tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures_lite::future;
use vitalband::app::events::AlertEvent;
use vitalband::app::ports::{
    EventSink, LauncherPort, LocationPort, NotifierPort, Permission, RelayPort, SourceFrame,
    TelemetrySource, TimePort,
};
use vitalband::error::{ChannelError, LocationError};
use vitalband::telemetry::GeoFix;

// ── Relay call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RelayCall {
    Post { url: String, body: String },
    Get { url: String },
}

enum Clock {
    Virtual(Cell<u64>),
    Real(Instant),
}

// ── MockPlatform ──────────────────────────────────────────────

pub struct MockPlatform {
    clock: Clock,
    pub permission: Cell<Permission>,
    /// Answer to a permission prompt.
    pub prompt_answer: Permission,
    pub notifications: RefCell<Vec<(String, String)>>,
    pub relay_calls: RefCell<Vec<RelayCall>>,
    /// Scripted relay replies, oldest first. Empty means `Ok(200)`.
    pub relay_replies: RefCell<VecDeque<Result<u16, ChannelError>>>,
    /// Polls a relay POST stays pending before it answers.
    pub relay_latency_polls: usize,
    /// Deep links already opened when the last relay POST answered.
    pub links_at_relay_reply: Cell<Option<usize>>,
    pub opened: RefCell<Vec<String>>,
    /// `None` never answers.
    pub gps: Option<Result<GeoFix, LocationError>>,
}

#[allow(dead_code)]
impl MockPlatform {
    /// Virtual clock starting at zero.
    pub fn new() -> Self {
        Self::with_clock(Clock::Virtual(Cell::new(0)))
    }

    /// Wall clock with real timers.
    pub fn real_time() -> Self {
        Self::with_clock(Clock::Real(Instant::now()))
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            permission: Cell::new(Permission::Granted),
            prompt_answer: Permission::Granted,
            notifications: RefCell::new(Vec::new()),
            relay_calls: RefCell::new(Vec::new()),
            relay_replies: RefCell::new(VecDeque::new()),
            relay_latency_polls: 0,
            links_at_relay_reply: Cell::new(None),
            opened: RefCell::new(Vec::new()),
            gps: Some(Err(LocationError::Unsupported)),
        }
    }

    pub fn reply_with(&self, replies: &[Result<u16, ChannelError>]) {
        self.relay_replies.borrow_mut().extend(replies.iter().copied());
    }

    pub fn advance(&self, ms: u64) {
        if let Clock::Virtual(now) = &self.clock {
            now.set(now.get() + ms);
        }
    }

    pub fn opened_with(&self, prefix: &str) -> Vec<String> {
        self.opened
            .borrow()
            .iter()
            .filter(|uri| uri.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn next_reply(&self) -> Result<u16, ChannelError> {
        self.relay_replies.borrow_mut().pop_front().unwrap_or(Ok(200))
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TimePort for MockPlatform {
    fn now_ms(&self) -> u64 {
        match &self.clock {
            Clock::Virtual(now) => now.get(),
            Clock::Real(start) => start.elapsed().as_millis() as u64,
        }
    }

    async fn sleep(&self, duration: Duration) {
        match &self.clock {
            Clock::Virtual(now) => now.set(now.get() + duration.as_millis() as u64),
            Clock::Real(_) => {
                async_io_mini::Timer::after(duration).await;
            }
        }
    }
}

impl NotifierPort for MockPlatform {
    fn permission(&self) -> Permission {
        self.permission.get()
    }

    async fn request_permission(&self) -> Permission {
        self.permission.set(self.prompt_answer);
        self.prompt_answer
    }

    fn show(&self, title: &str, body: &str) -> Result<(), ChannelError> {
        self.notifications
            .borrow_mut()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

impl RelayPort for MockPlatform {
    async fn post_json(&self, url: &str, body: &str) -> Result<u16, ChannelError> {
        self.relay_calls.borrow_mut().push(RelayCall::Post {
            url: url.to_string(),
            body: body.to_string(),
        });
        for _ in 0..self.relay_latency_polls {
            future::yield_now().await;
        }
        self.links_at_relay_reply
            .set(Some(self.opened.borrow().len()));
        self.next_reply()
    }

    async fn get(&self, url: &str) -> Result<u16, ChannelError> {
        self.relay_calls
            .borrow_mut()
            .push(RelayCall::Get { url: url.to_string() });
        self.next_reply()
    }
}

impl LauncherPort for MockPlatform {
    fn open(&self, uri: &str) -> Result<(), ChannelError> {
        self.opened.borrow_mut().push(uri.to_string());
        Ok(())
    }
}

impl LocationPort for MockPlatform {
    async fn current_fix(&self) -> Result<GeoFix, LocationError> {
        match self.gps {
            Some(answer) => answer,
            None => future::pending().await,
        }
    }
}

// ── Event recorder ────────────────────────────────────────────

/// Event sink whose log can be shared with a [`ScriptedSource`].
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Rc<RefCell<Vec<AlertEvent>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AlertEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn snapshot(&self) -> Vec<AlertEvent> {
        self.events.borrow().clone()
    }
}

impl EventSink for Recorder {
    fn emit(&mut self, event: &AlertEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// ── Scripted telemetry source ─────────────────────────────────

type Condition = Box<dyn Fn(&[AlertEvent]) -> bool>;

pub enum Step {
    Frame(SourceFrame),
    /// Real-time pause.
    Wait(Duration),
    /// Hold the next frame until the recorded events satisfy the check.
    Until(Condition),
}

/// Feeds frames from a script. `Until` steps poll the shared event log,
/// so frames can be placed relative to what the core has done.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    log: Rc<RefCell<Vec<AlertEvent>>>,
}

const POLL: Duration = Duration::from_millis(2);
const MAX_POLLS: u32 = 5_000;

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            steps: VecDeque::new(),
            log: recorder.events.clone(),
        }
    }

    pub fn json(mut self, payload: &str) -> Self {
        self.steps
            .push_back(Step::Frame(SourceFrame::Payload(payload.as_bytes().to_vec())));
        self
    }

    pub fn frame(mut self, frame: SourceFrame) -> Self {
        self.steps.push_back(Step::Frame(frame));
        self
    }

    pub fn wait_ms(mut self, ms: u64) -> Self {
        self.steps.push_back(Step::Wait(Duration::from_millis(ms)));
        self
    }

    pub fn until(mut self, check: impl Fn(&[AlertEvent]) -> bool + 'static) -> Self {
        self.steps.push_back(Step::Until(Box::new(check)));
        self
    }
}

impl TelemetrySource for ScriptedSource {
    async fn next_frame(&mut self) -> Option<SourceFrame> {
        while let Some(step) = self.steps.pop_front() {
            match step {
                Step::Frame(frame) => return Some(frame),
                Step::Wait(d) => {
                    async_io_mini::Timer::after(d).await;
                }
                Step::Until(check) => {
                    let mut polls = 0;
                    while !check(&self.log.borrow()) {
                        polls += 1;
                        assert!(polls < MAX_POLLS, "scripted condition never became true");
                        async_io_mini::Timer::after(POLL).await;
                    }
                }
            }
        }
        None
    }
}

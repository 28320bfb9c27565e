//! Port traits: the hexagonal boundary between the alert core and the host.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AlertService / Runtime (domain)
//! ```
//!
//! Driven adapters (clock, notifications, relay, deep links, positioning,
//! storage, event sinks) implement these traits. The core consumes them via
//! generics, so it never touches the host platform directly.
//!
//! Async operations return `impl Future` without a `Send` bound: the whole
//! core runs on a single-threaded cooperative executor.
//!
//! ## Security notes
//!
//! - **ProfilePort** implementations MUST validate before persisting.
//! - Relay credentials never pass through these ports; the dispatcher
//!   builds the request URL from startup configuration.

use core::future::Future;
use core::time::Duration;

use crate::error::{ChannelError, LocationError};
use crate::profile::CaregiverProfile;
use crate::telemetry::GeoFix;

// ───────────────────────────────────────────────────────────────
// Telemetry source (driving adapter: device/UI → core)
// ───────────────────────────────────────────────────────────────

/// One inbound frame from the device link or the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFrame {
    /// Raw device notification payload (JSON text).
    Payload(Vec<u8>),
    /// The user pressed "cancel alert".
    Cancel,
    /// The device link dropped.
    LinkLost,
}

/// Opaque stream of device notifications.
pub trait TelemetrySource {
    /// Next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> impl Future<Output = Option<SourceFrame>>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic clock plus an async timer.
pub trait TimePort {
    /// Milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> u64;

    /// Resolve after `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

// ───────────────────────────────────────────────────────────────
// Notification channels (driven adapters: core → host)
// ───────────────────────────────────────────────────────────────

/// Local push-notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not yet asked.
    Default,
}

/// Local push notifications.
pub trait NotifierPort {
    fn permission(&self) -> Permission;

    /// Prompt the user. Resolves with the new permission.
    fn request_permission(&self) -> impl Future<Output = Permission>;

    fn show(&self, title: &str, body: &str) -> Result<(), ChannelError>;
}

/// HTTPS transport for the bot-relay webhook.
///
/// Both calls resolve with the HTTP status on any response; only
/// transport-level failures are errors.
pub trait RelayPort {
    fn post_json(&self, url: &str, body: &str) -> impl Future<Output = Result<u16, ChannelError>>;

    fn get(&self, url: &str) -> impl Future<Output = Result<u16, ChannelError>>;
}

/// Hands deep links (`sms:`, `mailto:`, messaging URLs) to the host.
pub trait LauncherPort {
    fn open(&self, uri: &str) -> Result<(), ChannelError>;
}

/// Live positioning.
pub trait LocationPort {
    fn current_fix(&self) -> impl Future<Output = Result<GeoFix, LocationError>>;
}

/// Everything the runtime needs from the host, in one bound.
///
/// The `platform` parameter satisfies every port, the way a single host
/// object owns the clock, notification centre, network stack and launcher.
pub trait Platform: TimePort + NotifierPort + RelayPort + LauncherPort + LocationPort {}

impl<T> Platform for T where T: TimePort + NotifierPort + RelayPort + LauncherPort + LocationPort {}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → UI / logging)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AlertEvent`](super::events::AlertEvent)s
/// through this port: dashboard values, countdown progress, state changes.
/// Adapters decide where they go (log, UI, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AlertEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage ports (driven adapters: core ↔ key-value store)
// ───────────────────────────────────────────────────────────────

/// Flat key-value storage with string values.
///
/// Synchronous from the core's point of view. Writes MUST be atomic: a
/// crash mid-write leaves either the old or the new value.
pub trait StoragePort {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;

    fn exists(&self, key: &str) -> bool;
}

/// Loads and persists the caregiver profile.
///
/// # Security
///
/// Implementations MUST validate before persisting. Invalid values are
/// rejected with [`ProfileError::ValidationFailed`], never silently fixed:
/// an alert sent to a mangled phone number is worse than no profile.
/// On load, a contact field that fails validation is dropped (`None`)
/// rather than failing the whole profile.
pub trait ProfilePort {
    /// `Ok(None)` when no caregiver has been configured.
    fn load(&self) -> Result<Option<CaregiverProfile>, ProfileError>;

    fn save(&mut self, profile: &CaregiverProfile) -> Result<(), ProfileError>;

    fn clear(&mut self) -> Result<(), ProfileError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ProfilePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// Stored profile failed deserialization.
    Corrupted,
    /// A field failed validation; describes which and why.
    ValidationFailed(&'static str),
    /// Underlying storage failed.
    Storage(StorageError),
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Backing file could not be read or written.
    IoError,
    /// Backing file is not a valid store.
    Corrupted,
}

impl From<StorageError> for ProfileError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl core::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "stored profile corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "store corrupted"),
        }
    }
}

impl std::error::Error for ProfileError {}
impl std::error::Error for StorageError {}

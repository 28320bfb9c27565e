//! Location resolver: best-effort coordinates for an outgoing alert.
//!
//! Resolution order:
//!
//! 1. the position carried by the latest telemetry frame, if it is fresh;
//! 2. the last live fix, if it is fresh;
//! 3. a live fix from the [`LocationPort`], raced against a timeout.
//!
//! Failing all three is not an error: the alert still goes out with
//! "Location unavailable" in place of coordinates.

use core::cell::Cell;
use core::time::Duration;

use futures_lite::future;
use log::{debug, info, warn};

use crate::app::ports::{LocationPort, TimePort};
use crate::config::AlertConfig;
use crate::error::LocationError;
use crate::telemetry::GeoFix;

/// Where a fix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixSource {
    Telemetry,
    Cached,
    Live,
}

/// Outcome of one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Fix(GeoFix, FixSource),
    Unavailable,
}

impl Resolution {
    pub fn fix(&self) -> Option<GeoFix> {
        match self {
            Self::Fix(fix, _) => Some(*fix),
            Self::Unavailable => None,
        }
    }
}

/// Resolves a location, caching successful live fixes.
///
/// Uses a `Cell` for the cache so the resolver can be shared by reference
/// with the single-threaded runtime tasks.
pub struct LocationResolver {
    max_age_ms: u64,
    timeout: Duration,
    cached: Cell<Option<(GeoFix, u64)>>,
}

impl LocationResolver {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            max_age_ms: config.location_max_age_ms as u64,
            timeout: Duration::from_millis(config.location_timeout_ms as u64),
            cached: Cell::new(None),
        }
    }

    /// Resolve a location for an alert.
    ///
    /// `latest` is the most recent telemetry position together with the
    /// time it was received.
    pub async fn resolve<P>(&self, latest: Option<(GeoFix, u64)>, platform: &P) -> Resolution
    where
        P: LocationPort + TimePort,
    {
        let now = platform.now_ms();

        if let Some((fix, at)) = latest {
            if self.is_fresh(at, now) {
                debug!("location: using telemetry fix");
                return Resolution::Fix(fix, FixSource::Telemetry);
            }
        }

        if let Some((fix, at)) = self.cached.get() {
            if self.is_fresh(at, now) {
                debug!("location: reusing cached live fix");
                return Resolution::Fix(fix, FixSource::Cached);
            }
        }

        let live = async { Some(platform.current_fix().await) };
        let deadline = async {
            platform.sleep(self.timeout).await;
            None
        };

        match future::or(live, deadline).await {
            Some(Ok(fix)) => {
                info!("location: live fix ({:.5}, {:.5})", fix.lat, fix.lng);
                self.cached.set(Some((fix, platform.now_ms())));
                Resolution::Fix(fix, FixSource::Live)
            }
            Some(Err(e)) => {
                warn!("location: {}", e);
                Resolution::Unavailable
            }
            None => {
                warn!("location: {}", LocationError::Timeout);
                Resolution::Unavailable
            }
        }
    }

    /// Last successful live fix and when it was taken.
    pub fn cached(&self) -> Option<(GeoFix, u64)> {
        self.cached.get()
    }

    fn is_fresh(&self, at_ms: u64, now_ms: u64) -> bool {
        now_ms.abs_diff(at_ms) <= self.max_age_ms
    }
}

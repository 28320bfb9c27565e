//! Desktop host adapter.
//!
//! One object that owns the clock, the notification surface, the relay
//! client, the deep-link launcher and the position source, so the runtime
//! can take it as a single `&impl Platform`.
//!
//! - **Time**: `std::time::Instant` for the clock, `async-io-mini` timers
//!   for sleeps (reactor-driven, no busy-spinning).
//! - **Notifications**: written to the log; permission is always granted.
//! - **Deep links**: logged, and optionally handed to `xdg-open`.
//! - **Location**: a fixed home position when configured, otherwise
//!   unsupported.

use core::future::Future;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::{info, warn};

use super::relay_http::ReqwestRelay;
use crate::app::ports::{LauncherPort, LocationPort, NotifierPort, Permission, RelayPort, TimePort};
use crate::error::{ChannelError, LocationError};
use crate::telemetry::GeoFix;

pub struct HostPlatform {
    start: Instant,
    relay: ReqwestRelay,
    open_links: bool,
    home: Option<GeoFix>,
}

impl HostPlatform {
    pub fn new(relay: ReqwestRelay) -> Self {
        Self {
            start: Instant::now(),
            relay,
            open_links: false,
            home: None,
        }
    }

    /// Hand deep links to the desktop instead of only logging them.
    pub fn with_open_links(mut self, open: bool) -> Self {
        self.open_links = open;
        self
    }

    /// Answer live-fix requests with a fixed position.
    pub fn with_home(mut self, home: Option<GeoFix>) -> Self {
        self.home = home;
        self
    }
}

impl TimePort for HostPlatform {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    async fn sleep(&self, duration: Duration) {
        async_io_mini::Timer::after(duration).await;
    }
}

impl NotifierPort for HostPlatform {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn show(&self, title: &str, body: &str) -> Result<(), ChannelError> {
        info!("NOTIFY | {} | {}", title, body);
        Ok(())
    }
}

impl RelayPort for HostPlatform {
    fn post_json(&self, url: &str, body: &str) -> impl Future<Output = Result<u16, ChannelError>> {
        self.relay.post_json(url, body)
    }

    fn get(&self, url: &str) -> impl Future<Output = Result<u16, ChannelError>> {
        self.relay.get(url)
    }
}

impl LauncherPort for HostPlatform {
    fn open(&self, uri: &str) -> Result<(), ChannelError> {
        info!("LINK | {}", uri);
        if !self.open_links {
            return Ok(());
        }
        Command::new("xdg-open")
            .arg(uri)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| {
                warn!("LINK | xdg-open failed: {}", e);
                ChannelError::LaunchFailed
            })
    }
}

impl LocationPort for HostPlatform {
    async fn current_fix(&self) -> Result<GeoFix, LocationError> {
        self.home.ok_or(LocationError::Unsupported)
    }
}

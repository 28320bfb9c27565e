//! Alert configuration parameters
//!
//! All tunable parameters for the fall-alert core.
//! Values are supplied at startup (CLI flags / environment); relay
//! credentials are never compiled into the binary.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bot-relay webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    /// Relay API host, e.g. `api.telegram.org`
    pub host: String,
    /// Bot token. `None` disables the relay channel.
    pub token: Option<String>,
    /// Destination chat. `None` disables the relay channel.
    pub chat_id: Option<String>,
    /// Request timeout (milliseconds)
    pub timeout_ms: u32,
}

impl RelayConfig {
    /// Token and chat id, if both are present and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let chat = self.chat_id.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        Some((token, chat))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "api.telegram.org".into(),
            token: None,
            chat_id: None,
            timeout_ms: 10_000,
        }
    }
}

/// Core alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    // --- Throttle ---
    /// Lookback window for the trigger rate limit (milliseconds)
    pub throttle_window_ms: u64,
    /// Maximum alert cycles started inside one window
    pub throttle_max_alerts: u8,

    // --- Countdown ---
    /// Cancel window before dispatch (seconds)
    pub countdown_secs: u8,
    /// Countdown step period (milliseconds); one second in production
    pub tick_interval_ms: u32,
    /// Advisory delay for the UI completion state (milliseconds)
    pub completion_grace_ms: u32,

    // --- Location ---
    /// Live fix timeout (milliseconds)
    pub location_timeout_ms: u32,
    /// Maximum age of a reusable fix (milliseconds)
    pub location_max_age_ms: u32,

    // --- Dispatch ---
    /// Delay between consecutive channel launches (milliseconds)
    pub channel_stagger_ms: u32,
    /// Host of the peer-to-peer messaging deep link
    pub messaging_host: String,
    /// Map link prefix; `<lat>,<lng>` is appended
    pub maps_base_url: String,
    /// Title of the local push notification
    pub notification_title: String,
    pub relay: RelayConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            // Throttle
            throttle_window_ms: 20_000,
            throttle_max_alerts: 3,

            // Countdown
            countdown_secs: 7,
            tick_interval_ms: 1_000,
            completion_grace_ms: 5_000,

            // Location
            location_timeout_ms: 10_000,
            location_max_age_ms: 60_000,

            // Dispatch
            channel_stagger_ms: 500,
            messaging_host: "wa.me".into(),
            maps_base_url: "https://maps.google.com/maps?q=".into(),
            notification_title: "Vital Band Alert".into(),
            relay: RelayConfig::default(),
        }
    }
}

impl AlertConfig {
    /// Range-check every field. Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<()> {
        if !(1_000..=600_000).contains(&self.throttle_window_ms) {
            return Err(Error::Config("throttle_window_ms must be 1000–600000"));
        }
        if !(1..=crate::throttle::WINDOW_CAPACITY as u8).contains(&self.throttle_max_alerts) {
            return Err(Error::Config("throttle_max_alerts must be 1–8"));
        }
        if !(1..=60).contains(&self.countdown_secs) {
            return Err(Error::Config("countdown_secs must be 1–60"));
        }
        if !(10..=1_000).contains(&self.tick_interval_ms) {
            return Err(Error::Config("tick_interval_ms must be 10–1000"));
        }
        if self.completion_grace_ms > 30_000 {
            return Err(Error::Config("completion_grace_ms must be 0–30000"));
        }
        if !(100..=60_000).contains(&self.location_timeout_ms) {
            return Err(Error::Config("location_timeout_ms must be 100–60000"));
        }
        if self.location_max_age_ms > 3_600_000 {
            return Err(Error::Config("location_max_age_ms must be 0–3600000"));
        }
        if self.channel_stagger_ms > 1_500 {
            return Err(Error::Config("channel_stagger_ms must be 0–1500"));
        }
        if self.messaging_host.trim().is_empty() {
            return Err(Error::Config("messaging_host must not be empty"));
        }
        if self.maps_base_url.trim().is_empty() {
            return Err(Error::Config("maps_base_url must not be empty"));
        }
        if self.notification_title.trim().is_empty() {
            return Err(Error::Config("notification_title must not be empty"));
        }
        if self.relay.host.trim().is_empty() {
            return Err(Error::Config("relay.host must not be empty"));
        }
        Ok(())
    }
}

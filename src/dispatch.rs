//! Notification dispatcher: fans one alert out across every channel.
//!
//! ```text
//!              ┌──────────────────────┐
//!  Order ─────▶│ 0  local notification│  (awaited first)
//!              ├──────────────────────┤
//!              │ 1  bot relay    +1×s │ ┐
//!              │ 2  messaging    +2×s │ │ concurrent,
//!              │ 3  email        +3×s │ │ staggered by s
//!              │ 4  sms          +4×s │ ┘
//!              └──────────┬───────────┘
//!                         ▼
//!                   DispatchReport
//! ```
//!
//! Every channel is isolated: errors are logged and recorded in the
//! report, and one failing channel never prevents the next attempt.
//! Delivery is best-effort; nothing is retried.

use core::fmt;
use core::time::Duration;

use futures_lite::future;
use heapless::Vec;
use log::{info, warn};

use crate::app::cycle::{CycleId, DispatchOrder};
use crate::app::ports::{LauncherPort, NotifierPort, Permission, RelayPort, TimePort};
use crate::config::{AlertConfig, RelayConfig};
use crate::error::ChannelError;
use crate::location::Resolution;

/// Number of notification channels.
pub const CHANNEL_COUNT: usize = 5;

// ── Report types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    LocalNotification,
    BotRelay,
    Messaging,
    Email,
    Sms,
}

impl ChannelKind {
    /// Launch order.
    pub const ALL: [ChannelKind; CHANNEL_COUNT] = [
        Self::LocalNotification,
        Self::BotRelay,
        Self::Messaging,
        Self::Email,
        Self::Sms,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LocalNotification => "local",
            Self::BotRelay => "relay",
            Self::Messaging => "messaging",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a channel was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Local notifications are not permitted.
    PermissionDenied,
    /// Relay credentials are missing.
    NotConfigured,
    /// The profile has no usable phone number or email.
    MissingContact,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::NotConfigured => write!(f, "not configured"),
            Self::MissingContact => write!(f, "no contact for this channel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Sent,
    Skipped(SkipReason),
    Failed(ChannelError),
}

/// Per-channel results of one dispatch, in launch order.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub cycle: CycleId,
    pub outcomes: Vec<(ChannelKind, ChannelOutcome), CHANNEL_COUNT>,
}

impl DispatchReport {
    pub fn new(cycle: CycleId) -> Self {
        Self {
            cycle,
            outcomes: Vec::new(),
        }
    }

    pub fn outcome(&self, kind: ChannelKind) -> Option<ChannelOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, o)| *o)
    }

    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, ChannelOutcome::Sent))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ChannelOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ChannelOutcome::Failed(_)))
    }

    fn record(&mut self, kind: ChannelKind, outcome: ChannelOutcome) {
        match outcome {
            ChannelOutcome::Sent => info!("dispatch {}: {} sent", self.cycle, kind),
            ChannelOutcome::Skipped(why) => info!("dispatch {}: {} skipped ({})", self.cycle, kind, why),
            ChannelOutcome::Failed(e) => warn!("dispatch {}: {} failed: {}", self.cycle, kind, e),
        }
        // Capacity equals the number of channels; each is recorded once.
        let _ = self.outcomes.push((kind, outcome));
    }

    fn count(&self, pred: impl Fn(&ChannelOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

// ── Message composition ───────────────────────────────────────

/// All alert texts for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessages {
    pub local_body: String,
    pub relay_text: String,
    pub messaging_text: String,
    pub email_subject: String,
    pub email_body: String,
    pub sms_text: String,
}

impl AlertMessages {
    pub fn compose(caregiver_name: &str, location: &Resolution, maps_base_url: &str) -> Self {
        let (loc, map) = match location.fix() {
            Some(fix) => (
                format!("Lat: {}, Lng: {}", fix.lat, fix.lng),
                Some(format!("{}{},{}", maps_base_url, fix.lat, fix.lng)),
            ),
            None => ("Location unavailable".to_string(), None),
        };
        let suffix = |sep: &str| map.as_ref().map(|m| format!("{sep}{m}")).unwrap_or_default();

        Self {
            local_body: "🚨 EMERGENCY: Fall detected!".to_string(),
            relay_text: format!(
                "🚨 <b>EMERGENCY ALERT!</b>\nFall detected!\nCaregiver: {}\n{}{}",
                escape_html(caregiver_name),
                loc,
                suffix("\n")
            ),
            messaging_text: format!(
                "🚨 EMERGENCY ALERT 🚨\nFall detected!\nLocation: {}{}",
                loc,
                suffix("\nMaps: ")
            ),
            email_subject: "🚨 EMERGENCY: Fall Detected".to_string(),
            email_body: format!("Fall detected!\n\nLocation: {}{}", loc, suffix("\nMaps: ")),
            sms_text: format!("🚨 EMERGENCY: Fall detected! Location: {}{}", loc, suffix(" ")),
        }
    }
}

/// Percent-encode a URI component. Spaces become `%20`, never `+`.
pub fn encode_component(s: &str) -> String {
    // form_urlencoded emits `+` only for spaces; literal `+` is `%2B`.
    url::form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Keep ASCII digits only: `"+1 (555) 123-4567"` → `"15551234567"`.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// `sms:` address: digits plus a leading `+`, so the URI has no spaces.
pub fn sms_address(phone: &str) -> String {
    let digits = normalize_phone(phone);
    if phone.trim_start().starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Dispatcher ────────────────────────────────────────────────

pub struct Dispatcher {
    title: String,
    messaging_host: String,
    maps_base_url: String,
    relay: RelayConfig,
    stagger: Duration,
}

impl Dispatcher {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            title: config.notification_title.clone(),
            messaging_host: config.messaging_host.clone(),
            maps_base_url: config.maps_base_url.clone(),
            relay: config.relay.clone(),
            stagger: Duration::from_millis(config.channel_stagger_ms as u64),
        }
    }

    /// Send one alert through every channel.
    ///
    /// The `platform` parameter satisfies every outbound port plus the
    /// timer used for staggering.
    pub async fn dispatch<P>(&self, order: &DispatchOrder, platform: &P) -> DispatchReport
    where
        P: NotifierPort + RelayPort + LauncherPort + TimePort,
    {
        let msgs = AlertMessages::compose(&order.profile.name, &order.location, &self.maps_base_url);
        let mut report = DispatchReport::new(order.cycle);
        info!(
            "dispatch {}: alerting {} ({})",
            order.cycle,
            order.profile.name,
            if order.location.fix().is_some() { "with location" } else { "no location" }
        );

        let local = self.notify_local(&msgs, platform).await;
        report.record(ChannelKind::LocalNotification, local);

        let phone = order.profile.phone.as_deref();
        let email = order.profile.email.as_deref();

        let relay = async {
            platform.sleep(self.stagger).await;
            self.send_relay(&msgs.relay_text, platform).await
        };
        let messaging = async {
            platform.sleep(self.stagger * 2).await;
            self.open_messaging(phone, &msgs.messaging_text, platform)
        };
        let mail = async {
            platform.sleep(self.stagger * 3).await;
            open_email(email, &msgs.email_subject, &msgs.email_body, platform)
        };
        let sms = async {
            platform.sleep(self.stagger * 4).await;
            open_sms(phone, &msgs.sms_text, platform)
        };

        let ((relay, messaging), (mail, sms)) =
            future::zip(future::zip(relay, messaging), future::zip(mail, sms)).await;

        report.record(ChannelKind::BotRelay, relay);
        report.record(ChannelKind::Messaging, messaging);
        report.record(ChannelKind::Email, mail);
        report.record(ChannelKind::Sms, sms);

        info!(
            "dispatch {}: {} sent, {} skipped, {} failed",
            order.cycle,
            report.sent(),
            report.skipped(),
            report.failed()
        );
        report
    }

    // ── Channels ──────────────────────────────────────────────

    async fn notify_local(&self, msgs: &AlertMessages, platform: &impl NotifierPort) -> ChannelOutcome {
        let permission = match platform.permission() {
            Permission::Default => platform.request_permission().await,
            p => p,
        };
        if permission != Permission::Granted {
            return ChannelOutcome::Skipped(SkipReason::PermissionDenied);
        }
        outcome_of(platform.show(&self.title, &msgs.local_body))
    }

    async fn send_relay(&self, text: &str, platform: &impl RelayPort) -> ChannelOutcome {
        let Some((token, chat_id)) = self.relay.credentials() else {
            return ChannelOutcome::Skipped(SkipReason::NotConfigured);
        };
        let url = format!("https://{}/bot{}/sendMessage", self.relay.host, token);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        })
        .to_string();

        let status = match platform.post_json(&url, &body).await {
            // Some relay front-ends reject POST; retry once as a query-string GET.
            Ok(405) => {
                info!("relay: POST not allowed, falling back to GET");
                let get_url = format!(
                    "{}?chat_id={}&text={}&parse_mode=HTML",
                    url,
                    encode_component(chat_id),
                    encode_component(text)
                );
                platform.get(&get_url).await
            }
            other => other,
        };

        match status {
            Ok(code) if (200..300).contains(&code) => ChannelOutcome::Sent,
            Ok(code) => ChannelOutcome::Failed(ChannelError::HttpStatus(code)),
            Err(e) => ChannelOutcome::Failed(e),
        }
    }

    fn open_messaging(&self, phone: Option<&str>, text: &str, platform: &impl LauncherPort) -> ChannelOutcome {
        let digits = phone.map(normalize_phone).unwrap_or_default();
        if digits.is_empty() {
            return ChannelOutcome::Skipped(SkipReason::MissingContact);
        }
        let uri = format!(
            "https://{}/{}?text={}",
            self.messaging_host,
            digits,
            encode_component(text)
        );
        outcome_of(platform.open(&uri))
    }
}

fn open_email(email: Option<&str>, subject: &str, body: &str, platform: &impl LauncherPort) -> ChannelOutcome {
    let Some(email) = email else {
        return ChannelOutcome::Skipped(SkipReason::MissingContact);
    };
    let uri = format!(
        "mailto:{}?subject={}&body={}",
        email,
        encode_component(subject),
        encode_component(body)
    );
    outcome_of(platform.open(&uri))
}

fn open_sms(phone: Option<&str>, text: &str, platform: &impl LauncherPort) -> ChannelOutcome {
    let address = phone.map(sms_address).unwrap_or_default();
    if address.trim_start_matches('+').is_empty() {
        return ChannelOutcome::Skipped(SkipReason::MissingContact);
    }
    let uri = format!("sms:{}?body={}", address, encode_component(text));
    outcome_of(platform.open(&uri))
}

fn outcome_of(result: Result<(), ChannelError>) -> ChannelOutcome {
    match result {
        Ok(()) => ChannelOutcome::Sent,
        Err(e) => ChannelOutcome::Failed(e),
    }
}

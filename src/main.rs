//! VitalBand Companion: Main Entry Point
//!
//! Hexagonal architecture around a cooperative, single-threaded runtime.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  StdinSource       LogEventSink   KvStore        HostPlatform  │
//! │  (TelemetrySource) (EventSink)    (Profile+KV)   (Time+Notify  │
//! │                                                   +Link+GPS)   │
//! │  ReqwestRelay (RelayPort)                                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AlertService (pure logic)                 │    │
//! │  │  FSM · Throttle · Cycle bookkeeping                    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime (ticker · locator · dispatcher) · Diagnostics         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use vitalband::adapters::host::HostPlatform;
use vitalband::adapters::kv_store::KvStore;
use vitalband::adapters::log_sink::LogEventSink;
use vitalband::adapters::relay_http::ReqwestRelay;
use vitalband::adapters::stdin_source::StdinSource;
use vitalband::app::ports::ProfilePort;
use vitalband::config::AlertConfig;
use vitalband::profile::CaregiverProfile;
use vitalband::runtime;
use vitalband::telemetry::GeoFix;

// ── Command line ──────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vitalband", version, about = "VitalBand fall-alert companion")]
struct Cli {
    /// Key-value store holding the caregiver profile
    #[arg(long, env = "VITALBAND_STORE", default_value = "vitalband-store.json", global = true)]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read telemetry lines from stdin and run the alert pipeline
    Run(RunArgs),
    /// Save the caregiver who receives alerts
    SetCaregiver {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Print the stored caregiver
    ShowCaregiver,
    /// Remove the stored caregiver
    ClearCaregiver,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Bot-relay API host
    #[arg(long, env = "VITALBAND_RELAY_HOST", default_value = "api.telegram.org")]
    relay_host: String,
    /// Bot-relay token (never logged)
    #[arg(long, env = "VITALBAND_RELAY_TOKEN", hide_env_values = true)]
    relay_token: Option<String>,
    /// Bot-relay destination chat
    #[arg(long, env = "VITALBAND_RELAY_CHAT_ID")]
    relay_chat_id: Option<String>,
    /// Relay request timeout (milliseconds)
    #[arg(long, env = "VITALBAND_RELAY_TIMEOUT_MS", default_value_t = 10_000)]
    relay_timeout_ms: u32,

    /// Cancel window before dispatch (seconds)
    #[arg(long, default_value_t = 7)]
    countdown_secs: u8,

    /// Position reported when a live fix is requested
    #[arg(long, requires = "home_lng", allow_negative_numbers = true)]
    home_lat: Option<f64>,
    #[arg(long, requires = "home_lat", allow_negative_numbers = true)]
    home_lng: Option<f64>,

    /// Hand deep links to `xdg-open` instead of only logging them
    #[arg(long)]
    open_links: bool,
}

impl RunArgs {
    fn alert_config(&self) -> AlertConfig {
        let mut config = AlertConfig::default();
        config.countdown_secs = self.countdown_secs;
        config.relay.host = self.relay_host.clone();
        config.relay.token = self.relay_token.clone();
        config.relay.chat_id = self.relay_chat_id.clone();
        config.relay.timeout_ms = self.relay_timeout_ms;
        config
    }

    fn home(&self) -> Result<Option<GeoFix>> {
        match (self.home_lat, self.home_lng) {
            (Some(lat), Some(lng)) => match GeoFix::checked(lat, lng) {
                Some(fix) => Ok(Some(fix)),
                None => bail!("home position {},{} is out of range", lat, lng),
            },
            _ => Ok(None),
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Environment + logging ──────────────────────────────
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // ── 2. Open the store ─────────────────────────────────────
    let mut store = KvStore::open(&cli.store)
        .with_context(|| format!("opening store {}", cli.store.display()))?;

    match cli.command {
        Command::Run(args) => run(&args, &store),
        Command::SetCaregiver { name, phone, email } => {
            let profile = CaregiverProfile::new(&name, phone.as_deref(), email.as_deref());
            store.save(&profile).context("saving caregiver")?;
            info!("Caregiver saved: {}", profile.name);
            Ok(())
        }
        Command::ShowCaregiver => {
            match store.load().context("loading caregiver")? {
                Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
                None => println!("no caregiver configured"),
            }
            Ok(())
        }
        Command::ClearCaregiver => {
            store.clear().context("clearing caregiver")?;
            info!("Caregiver cleared");
            Ok(())
        }
    }
}

fn run(args: &RunArgs, store: &KvStore) -> Result<()> {
    info!("╔══════════════════════════════════════╗");
    info!("║  VitalBand v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 3. Config ─────────────────────────────────────────────
    let config = args.alert_config();
    config.validate().context("invalid configuration")?;
    if config.relay.credentials().is_none() {
        warn!("Relay credentials missing; the relay channel will be skipped");
    }
    if !matches!(store.load(), Ok(Some(_))) {
        warn!("No caregiver configured; falls will not raise alerts (see `set-caregiver`)");
    }

    // ── 4. Construct adapters ─────────────────────────────────
    let relay = ReqwestRelay::new(Duration::from_millis(u64::from(config.relay.timeout_ms)))
        .context("building relay client")?;
    let platform = HostPlatform::new(relay)
        .with_open_links(args.open_links)
        .with_home(args.home()?);
    let source = StdinSource::spawn().context("starting telemetry reader")?;
    let mut sink = LogEventSink::new();

    // ── 5. Run until input closes ─────────────────────────────
    let summary = runtime::run(config, source, &platform, store, &mut sink);

    info!(
        "Finished: {} cycle(s) completed, {} dispatch report(s) ({} kept)",
        summary.stats.cycles_completed,
        summary.results.total(),
        summary.results.len()
    );
    println!("{}", serde_json::to_string_pretty(&summary.stats)?);
    Ok(())
}

//! End-to-end tests for the cooperative runtime.
//!
//! These use real `async-io-mini` timers with a short countdown step, and
//! a scripted source that places cancel presses relative to the events the
//! core has already emitted, so the outcome does not depend on timing.

use crate::mock_platform::{MockPlatform, Recorder, ScriptedSource};

use vitalband::adapters::kv_store::KvStore;
use vitalband::app::cycle::CycleId;
use vitalband::app::events::AlertEvent;
use vitalband::app::ports::{ProfilePort, SourceFrame};
use vitalband::config::AlertConfig;
use vitalband::dispatch::{ChannelKind, ChannelOutcome};
use vitalband::location::{FixSource, Resolution};
use vitalband::profile::CaregiverProfile;
use vitalband::runtime::{self, RunSummary};
use vitalband::telemetry::GeoFix;

const FALL: &str = r#"{"steps":40,"heartRate":120,"fall":true}"#;
const FALL_AT_HOME: &str = r#"{"steps":40,"heartRate":120,"fall":true,"lat":52.52,"lng":13.405}"#;

fn fast_config() -> AlertConfig {
    let mut config = AlertConfig::default();
    config.tick_interval_ms = 40;
    config.channel_stagger_ms = 0;
    config.location_timeout_ms = 100;
    config
}

fn caregiver() -> KvStore {
    let mut store = KvStore::in_memory();
    store
        .save(&CaregiverProfile::new("Ana", Some("+1 555 0100 200"), None))
        .unwrap();
    store
}

fn run_script(
    store: &KvStore,
    platform: &MockPlatform,
    script: impl FnOnce(ScriptedSource) -> ScriptedSource,
) -> (RunSummary, Recorder) {
    let mut sink = Recorder::new();
    let source = script(ScriptedSource::new(&sink));
    let summary = runtime::run(fast_config(), source, platform, store, &mut sink);
    (summary, sink)
}

#[test]
fn fall_counts_down_and_dispatches_once() {
    let platform = MockPlatform::real_time();
    let (summary, sink) = run_script(&caregiver(), &platform, |s| s.json(FALL_AT_HOME));

    assert_eq!(summary.stats.cycles_started, 1);
    assert_eq!(summary.stats.cycles_completed, 1);
    assert_eq!(summary.results.len(), 1);

    // 7, 6, ..., 1, 0 in order.
    let progress: Vec<u8> = sink
        .snapshot()
        .iter()
        .filter_map(|e| match e {
            AlertEvent::CountdownProgress { remaining_secs, .. } => Some(*remaining_secs),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![7, 6, 5, 4, 3, 2, 1, 0]);

    assert!(sink.snapshot().contains(&AlertEvent::CycleCompleted {
        cycle: CycleId(1),
        location: Resolution::Fix(GeoFix { lat: 52.52, lng: 13.405 }, FixSource::Telemetry),
        grace_ms: 5_000,
    }));

    let report = summary.results.latest().unwrap();
    assert_eq!(report.outcome(ChannelKind::Messaging), Some(ChannelOutcome::Sent));
    assert_eq!(platform.opened_with("https://wa.me/15550100200?").len(), 1);
    assert_eq!(platform.opened_with("sms:").len(), 1);
    assert!(platform.opened_with("mailto:").is_empty());
}

#[test]
fn cancel_mid_countdown_suppresses_dispatch_and_allows_new_cycle() {
    let platform = MockPlatform::real_time();
    let (summary, sink) = run_script(&caregiver(), &platform, |s| {
        s.json(FALL)
            .until(|events| {
                events.iter().any(|e| {
                    matches!(e, AlertEvent::CountdownProgress { cycle: CycleId(1), remaining_secs: 4 })
                })
            })
            .frame(SourceFrame::Cancel)
            .until(|events| events.iter().any(|e| matches!(e, AlertEvent::CycleCancelled { .. })))
            .json(FALL)
    });

    assert!(sink.snapshot().contains(&AlertEvent::CycleCancelled {
        cycle: CycleId(1),
        remaining_secs: 4,
    }));
    assert_eq!(summary.stats.cycles_started, 2);
    assert_eq!(summary.stats.cycles_cancelled, 1);
    assert_eq!(summary.stats.cycles_completed, 1);

    // Only the second cycle reached the caregiver.
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results.latest().map(|r| r.cycle), Some(CycleId(2)));
    assert_eq!(platform.opened_with("sms:").len(), 1);
}

#[test]
fn burst_of_falls_yields_a_single_alert() {
    let platform = MockPlatform::real_time();
    let (summary, _) = run_script(&caregiver(), &platform, |s| {
        (0..5).fold(s, |s, _| s.json(FALL).wait_ms(5))
    });

    assert_eq!(summary.stats.falls, 5);
    assert_eq!(summary.stats.cycles_started, 1);
    assert_eq!(summary.stats.throttled, 4);
    assert_eq!(summary.results.len(), 1);
}

#[test]
fn fall_without_caregiver_stops_at_setup() {
    let platform = MockPlatform::real_time();
    let store = KvStore::in_memory();
    let (summary, sink) = run_script(&store, &platform, |s| s.json(FALL));

    assert_eq!(summary.stats.needs_setup, 1);
    assert_eq!(summary.stats.cycles_started, 0);
    assert!(summary.results.is_empty());
    assert_eq!(sink.count(|e| matches!(e, AlertEvent::CountdownProgress { .. })), 0);
    assert!(platform.opened.borrow().is_empty());
}

#[test]
fn bad_frames_are_dropped_and_ingest_continues() {
    let platform = MockPlatform::real_time();
    let (summary, _) = run_script(&caregiver(), &platform, |s| {
        s.json("{oops")
            .json(r#"{"steps":1,"heartRate":61}"#)
            .frame(SourceFrame::LinkLost)
            .json(r#"{"steps":2,"heartRate":62}"#)
    });

    assert_eq!(summary.stats.frames_dropped, 1);
    assert_eq!(summary.stats.frames, 2);
    assert_eq!(summary.stats.link_losses, 1);
    assert_eq!(summary.stats.cycles_started, 0);
}

#[test]
fn cancel_without_alert_is_harmless() {
    let platform = MockPlatform::real_time();
    let (summary, sink) = run_script(&caregiver(), &platform, |s| s.frame(SourceFrame::Cancel));

    assert_eq!(summary.stats.cycles_cancelled, 0);
    assert_eq!(sink.count(|e| matches!(e, AlertEvent::CycleCancelled { .. })), 0);
}

#[test]
fn caregiver_lookup_happens_per_fall() {
    let platform = MockPlatform::real_time();
    let mut store = caregiver();
    store.clear().unwrap();
    let (summary, _) = run_script(&store, &platform, |s| s.json(FALL).json(FALL));

    // Neither fall was recorded by the throttle, so both asked for setup.
    assert_eq!(summary.stats.needs_setup, 2);
    assert_eq!(summary.stats.throttled, 0);
}

//! Integration tests for the telemetry → AlertService → dispatch pipeline.
//!
//! Time is virtual: every call passes an explicit `now_ms`, and the mock
//! platform's sleeps advance its clock instantly.

use futures_lite::future::block_on;

use crate::mock_platform::{MockPlatform, Recorder};

use vitalband::adapters::kv_store::KvStore;
use vitalband::app::cycle::CycleId;
use vitalband::app::events::AlertEvent;
use vitalband::app::ports::{ProfilePort, StoragePort, TimePort};
use vitalband::app::service::{AlertService, FallOutcome, TickOutcome};
use vitalband::config::AlertConfig;
use vitalband::dispatch::{ChannelKind, ChannelOutcome, Dispatcher, SkipReason};
use vitalband::fsm::StateId;
use vitalband::location::{FixSource, LocationResolver, Resolution};
use vitalband::profile::{CaregiverProfile, PROFILE_KEY};
use vitalband::telemetry::{self, GeoFix};

fn store_with_caregiver() -> KvStore {
    let mut store = KvStore::in_memory();
    store
        .save(&CaregiverProfile::new(
            "Ana",
            Some("+1 (555) 123-4567"),
            Some("ana@example.org"),
        ))
        .unwrap();
    store
}

fn make_service() -> (AlertService, Recorder) {
    let mut service = AlertService::new(AlertConfig::default());
    let mut sink = Recorder::new();
    service.start(&mut sink);
    (service, sink)
}

fn fall_frame() -> telemetry::TelemetryReading {
    telemetry::decode(br#"{"steps":12,"heartRate":110,"fall":true}"#).unwrap()
}

fn run_countdown(service: &mut AlertService, cycle: CycleId, sink: &mut Recorder) {
    for _ in 0..service.config().countdown_secs {
        let _ = service.tick(cycle, sink);
    }
}

// ── Throttle ──────────────────────────────────────────────────

#[test]
fn five_cancelled_falls_one_second_apart_start_at_most_three_cycles() {
    let (mut service, mut sink) = make_service();
    let store = store_with_caregiver();

    let mut started = 0;
    for i in 0..5u64 {
        let outcome = service.on_telemetry(fall_frame(), i * 1_000, &store, &mut sink);
        if let FallOutcome::Started(_) = outcome {
            started += 1;
            // Release the lock so only the rate limit can refuse.
            assert!(service.cancel(&mut sink));
        } else {
            assert_eq!(outcome, FallOutcome::Throttled);
        }
    }

    assert_eq!(started, 3);
    assert_eq!(sink.count(|e| matches!(e, AlertEvent::Throttled)), 2);
    assert_eq!(service.recent_triggers(), 3);
}

#[test]
fn falls_during_a_countdown_never_start_a_second_cycle() {
    let (mut service, mut sink) = make_service();
    let store = store_with_caregiver();

    let first = service.on_telemetry(fall_frame(), 0, &store, &mut sink);
    assert!(matches!(first, FallOutcome::Started(_)));

    for i in 1..5u64 {
        assert_eq!(
            service.on_telemetry(fall_frame(), i * 1_000, &store, &mut sink),
            FallOutcome::Throttled
        );
    }
    assert_eq!(sink.count(|e| matches!(e, AlertEvent::CycleStarted { .. })), 1);
}

#[test]
fn window_slides_after_twenty_seconds() {
    let (mut service, mut sink) = make_service();
    let store = store_with_caregiver();

    for i in 0..3u64 {
        assert!(matches!(
            service.on_telemetry(fall_frame(), i * 1_000, &store, &mut sink),
            FallOutcome::Started(_)
        ));
        service.cancel(&mut sink);
    }
    assert_eq!(
        service.on_telemetry(fall_frame(), 3_000, &store, &mut sink),
        FallOutcome::Throttled
    );

    // The first trigger ages out at 20 s.
    assert!(matches!(
        service.on_telemetry(fall_frame(), 20_000, &store, &mut sink),
        FallOutcome::Started(_)
    ));
}

// ── Cancel ────────────────────────────────────────────────────

#[test]
fn cancel_at_three_seconds_then_new_fall_starts_fresh_cycle() {
    let (mut service, mut sink) = make_service();
    let store = store_with_caregiver();

    let FallOutcome::Started(first) = service.on_telemetry(fall_frame(), 0, &store, &mut sink)
    else {
        panic!("first fall should start a cycle");
    };
    for _ in 0..3 {
        let _ = service.tick(first, &mut sink);
    }
    assert_eq!(service.remaining_secs(), 4);
    assert!(service.cancel(&mut sink));
    assert_eq!(service.state(), StateId::Idle);

    // Late ticks for the cancelled cycle change nothing.
    assert_eq!(service.tick(first, &mut sink), TickOutcome::Stale);

    let FallOutcome::Started(second) =
        service.on_telemetry(fall_frame(), 4_000, &store, &mut sink)
    else {
        panic!("fall after cancel should start a cycle");
    };
    assert_ne!(first, second);
    assert_eq!(service.remaining_secs(), 7);
    assert!(sink.snapshot().contains(&AlertEvent::CycleCancelled {
        cycle: first,
        remaining_secs: 4,
    }));
}

#[test]
fn cancel_after_expiry_does_not_stop_dispatch() {
    let (mut service, mut sink) = make_service();
    let store = store_with_caregiver();

    let FallOutcome::Started(cycle) = service.on_telemetry(fall_frame(), 0, &store, &mut sink)
    else {
        panic!("fall should start a cycle");
    };
    run_countdown(&mut service, cycle, &mut sink);
    assert_eq!(service.state(), StateId::Dispatching);

    assert!(!service.cancel(&mut sink));
    let order = service.location_resolved(cycle, Resolution::Unavailable, &mut sink);
    assert!(order.is_some());
    assert_eq!(sink.count(|e| matches!(e, AlertEvent::CycleCancelled { .. })), 0);
}

// ── Setup ─────────────────────────────────────────────────────

#[test]
fn fall_without_caregiver_reports_needs_setup() {
    let (mut service, mut sink) = make_service();
    let store = KvStore::in_memory();

    assert_eq!(
        service.on_telemetry(fall_frame(), 0, &store, &mut sink),
        FallOutcome::NeedsSetup
    );
    assert_eq!(service.state(), StateId::Idle);
    assert_eq!(service.recent_triggers(), 0);
    assert_eq!(sink.count(|e| matches!(e, AlertEvent::NeedsSetup)), 1);
}

#[test]
fn unreadable_caregiver_is_treated_as_missing() {
    let (mut service, mut sink) = make_service();
    let mut store = KvStore::in_memory();
    store.set(PROFILE_KEY, "not json").unwrap();

    assert_eq!(
        service.on_telemetry(fall_frame(), 0, &store, &mut sink),
        FallOutcome::NeedsSetup
    );
}

#[test]
fn bad_stored_phone_still_alerts_by_email() {
    let config = AlertConfig::default();
    let (mut service, mut sink) = make_service();
    let mut store = KvStore::in_memory();
    store
        .set(
            PROFILE_KEY,
            r#"{"name":"Ana","phone":"911","email":"ana@example.org"}"#,
        )
        .unwrap();
    let platform = MockPlatform::new();

    let FallOutcome::Started(cycle) = service.on_telemetry(fall_frame(), 0, &store, &mut sink)
    else {
        panic!("a usable email should be enough to start a cycle");
    };
    run_countdown(&mut service, cycle, &mut sink);
    let order = service
        .location_resolved(cycle, Resolution::Unavailable, &mut sink)
        .unwrap();
    assert_eq!(order.profile.phone, None);

    let report = block_on(Dispatcher::new(&config).dispatch(&order, &platform));
    assert_eq!(report.outcome(ChannelKind::Email), Some(ChannelOutcome::Sent));
    assert_eq!(
        report.outcome(ChannelKind::Sms),
        Some(ChannelOutcome::Skipped(SkipReason::MissingContact))
    );
    assert_eq!(platform.opened_with("mailto:ana@example.org?").len(), 1);
}

#[test]
fn profile_edits_apply_to_the_next_cycle_only() {
    let (mut service, mut sink) = make_service();
    let mut store = store_with_caregiver();

    let FallOutcome::Started(cycle) = service.on_telemetry(fall_frame(), 0, &store, &mut sink)
    else {
        panic!("fall should start a cycle");
    };
    store
        .save(&CaregiverProfile::new("Bo", None, Some("bo@example.org")))
        .unwrap();

    run_countdown(&mut service, cycle, &mut sink);
    let order = service
        .location_resolved(cycle, Resolution::Unavailable, &mut sink)
        .unwrap();
    assert_eq!(order.profile.name, "Ana");
}

// ── Full pipeline ─────────────────────────────────────────────

#[test]
fn expired_countdown_resolves_location_and_dispatches_every_channel() {
    let config = AlertConfig::default();
    let (mut service, mut sink) = make_service();
    let store = store_with_caregiver();
    let platform = MockPlatform::new();
    let resolver = LocationResolver::new(&config);
    let dispatcher = Dispatcher::new(&config);

    let reading =
        telemetry::decode(br#"{"steps":1,"heartRate":98,"fall":true,"lat":52.52,"lng":13.405}"#)
            .unwrap();
    let FallOutcome::Started(cycle) =
        service.on_telemetry(reading, platform.now_ms(), &store, &mut sink)
    else {
        panic!("fall should start a cycle");
    };

    for _ in 0..7 {
        platform.advance(1_000);
        let _ = service.tick(cycle, &mut sink);
    }
    assert_eq!(service.state(), StateId::Dispatching);
    assert!(service.is_active(), "lock held until the location is known");

    let resolution = block_on(resolver.resolve(service.latest_fix(), &platform));
    assert_eq!(
        resolution,
        Resolution::Fix(GeoFix { lat: 52.52, lng: 13.405 }, FixSource::Telemetry)
    );

    let order = service
        .location_resolved(cycle, resolution, &mut sink)
        .unwrap();
    assert!(!service.is_active(), "lock released at hand-off");

    let report = block_on(dispatcher.dispatch(&order, &platform));
    assert_eq!(report.outcome(ChannelKind::LocalNotification), Some(ChannelOutcome::Sent));
    assert_eq!(
        report.outcome(ChannelKind::BotRelay),
        Some(ChannelOutcome::Skipped(SkipReason::NotConfigured))
    );
    assert_eq!(report.sent(), 4);
    assert_eq!(platform.opened.borrow().len(), 3);
    assert!(platform.opened_with("https://wa.me/15551234567?text=")[0].contains("52.52%2C13.405"));
}

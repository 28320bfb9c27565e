//! Fuzz target: `telemetry::decode`
//!
//! Drives arbitrary byte sequences into the notification decoder and
//! asserts that it never panics and never yields an out-of-range position.
//!
//! cargo fuzz run fuzz_telemetry_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use vitalband::telemetry;

fuzz_target!(|data: &[u8]| {
    if let Ok(reading) = telemetry::decode(data) {
        if let Some(fix) = reading.location {
            assert!((-90.0..=90.0).contains(&fix.lat), "latitude out of range");
            assert!((-180.0..=180.0).contains(&fix.lng), "longitude out of range");
        }
    }
});

//! Fuzz target: `ResultLog` ring buffer
//!
//! Pushes an arbitrary number of dispatch reports and verifies:
//! - No panics for any count
//! - The ring never holds more than `RESULT_LOG_SLOTS` reports
//! - Reports come back oldest first, ending with the latest push
//!
//! cargo fuzz run fuzz_result_log

#![no_main]

use libfuzzer_sys::fuzz_target;
use vitalband::app::cycle::CycleId;
use vitalband::diagnostics::{RESULT_LOG_SLOTS, ResultLog};
use vitalband::dispatch::DispatchReport;

fuzz_target!(|data: &[u8]| {
    let mut log = ResultLog::new();
    for &b in data {
        log.push(DispatchReport::new(CycleId(u32::from(b))));
    }

    assert!(log.len() <= RESULT_LOG_SLOTS, "ring exceeded capacity");
    assert_eq!(log.total() as usize, data.len());
    assert_eq!(log.len(), data.len().min(RESULT_LOG_SLOTS));
    if let Some(&last) = data.last() {
        assert_eq!(log.latest().map(|r| r.cycle), Some(CycleId(u32::from(last))));
        assert_eq!(log.iter().last().map(|r| r.cycle), Some(CycleId(u32::from(last))));
    }
});

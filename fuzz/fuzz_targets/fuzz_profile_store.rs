//! Fuzz target: caregiver profile persistence
//!
//! Writes arbitrary text under the profile key and checks that loading
//! never panics and that anything `load` returns passes validation, so a
//! hand-edited store can never feed a bad contact into an alert.
//!
//! cargo fuzz run fuzz_profile_store

#![no_main]

use libfuzzer_sys::fuzz_target;
use vitalband::adapters::kv_store::{KvStore, validate_profile};
use vitalband::app::ports::{ProfilePort, StoragePort};
use vitalband::profile::{CaregiverProfile, PROFILE_KEY};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let mut store = KvStore::in_memory();
    store.set(PROFILE_KEY, text).unwrap();
    if let Ok(Some(profile)) = store.load() {
        assert!(validate_profile(&profile).is_ok(), "load returned an invalid profile");
    }

    // Splitting the input into fields must never panic either; a rejected
    // save leaves the previous value in place.
    let mut parts = text.splitn(3, '\n');
    let name = parts.next().unwrap_or("");
    let phone = parts.next();
    let email = parts.next();
    let before = store.get(PROFILE_KEY).unwrap();
    if store.save(&CaregiverProfile::new(name, phone, email)).is_err() {
        assert_eq!(store.get(PROFILE_KEY).unwrap(), before);
    }

    store.clear().unwrap();
    assert_eq!(store.load(), Ok(None));
});

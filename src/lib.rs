//! VitalBand companion library.
//!
//! Exposes the fall-alert core and the host adapters for the binary and
//! for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod fsm;
pub mod location;
pub mod profile;
pub mod runtime;
pub mod telemetry;
pub mod throttle;

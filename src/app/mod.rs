//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the alert rules: throttling, the cancellable
//! countdown, and the hand-off to dispatch. All interaction with the host
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without a device or network.

pub mod cycle;
pub mod events;
pub mod ports;
pub mod service;

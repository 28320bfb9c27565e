//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the recording mock host. All tests run on the host with no
//! device, network or desktop required.

mod mock_platform;
mod runtime_tests;
mod service_tests;

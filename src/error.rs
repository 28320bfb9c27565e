//! Error types for the VitalBand client.
//!
//! `Error` covers startup failures. The per-area enums are `Copy` and ride
//! through dispatch reports and events without allocation.
//!
//! None of the per-area errors is fatal to the runtime: ingest errors drop
//! a frame, channel errors fail one channel, location errors degrade to
//! "Location unavailable".

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Failure that prevents the runtime from starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    /// Payload is empty or whitespace only.
    Empty,
    /// Payload bytes are not valid UTF-8.
    NotUtf8,
    /// Payload is not a JSON object of the expected shape.
    Malformed,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::NotUtf8 => write!(f, "payload is not UTF-8"),
            Self::Malformed => write!(f, "malformed telemetry payload"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Remote answered with a non-2xx status.
    HttpStatus(u16),
    /// Network or TLS failure before any status was received.
    Transport,
    /// The host refused to open a deep link.
    LaunchFailed,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "HTTP status {code}"),
            Self::Transport => write!(f, "transport failure"),
            Self::LaunchFailed => write!(f, "deep link launch failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Location errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    /// No positioning capability on this host.
    Unsupported,
    /// No fix arrived within the timeout.
    Timeout,
    /// The platform reported an error (permission, hardware).
    Platform,
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "positioning unsupported"),
            Self::Timeout => write!(f, "location fix timed out"),
            Self::Platform => write!(f, "platform location error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

//! Telemetry ingest: decodes raw device notifications.
//!
//! The wearable pushes one JSON object per notification:
//!
//! ```text
//! {"steps": 1204, "heartRate": 72, "fall": false, "lat": 52.52, "lng": 13.40}
//! ```
//!
//! Missing or `null` counters decode as zero, `fall` defaults to `false`,
//! and a location is only attached when both coordinates are present and
//! inside the WGS-84 range. Anything else is a decode error; the caller
//! drops the frame and keeps ingesting.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// A WGS-84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub lat: f64,
    pub lng: f64,
}

impl GeoFix {
    /// `Some` only when both coordinates are finite and in range.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

/// One decoded device notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReading {
    pub heart_rate_bpm: u32,
    pub step_count: u32,
    pub fall_detected: bool,
    pub location: Option<GeoFix>,
}

/// Raw wire shape, kept private so the typed reading stays the only API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFrame {
    #[serde(default)]
    steps: Option<u32>,
    #[serde(default)]
    heart_rate: Option<u32>,
    #[serde(default)]
    fall: Option<bool>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
}

/// Decode one payload into a [`TelemetryReading`].
pub fn decode(payload: &[u8]) -> Result<TelemetryReading, IngestError> {
    let text = core::str::from_utf8(payload).map_err(|_| IngestError::NotUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(IngestError::Empty);
    }

    let frame: WireFrame = serde_json::from_str(text).map_err(|_| IngestError::Malformed)?;

    let location = match (frame.lat, frame.lng) {
        (Some(lat), Some(lng)) => {
            let fix = GeoFix::checked(lat, lng);
            if fix.is_none() {
                log::debug!("telemetry: discarding out-of-range location ({lat}, {lng})");
            }
            fix
        }
        _ => None,
    };

    Ok(TelemetryReading {
        heart_rate_bpm: frame.heart_rate.unwrap_or(0),
        step_count: frame.steps.unwrap_or(0),
        fall_detected: frame.fall.unwrap_or(false),
        location,
    })
}

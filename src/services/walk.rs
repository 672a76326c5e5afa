// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walking trace verification.
//!
//! A trace is a sequence of GPS fixes. Consecutive fixes form segments; a
//! segment counts towards the walked distance only if it moves further than
//! the GPS jitter floor and its speed is plausible for a person walking.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Slowest speed that still counts as walking (km/h).
pub const MIN_WALKING_SPEED_KMH: f64 = 1.0;
/// Fastest speed that still counts as walking (km/h).
pub const MAX_WALKING_SPEED_KMH: f64 = 7.0;
/// Displacements below this are treated as GPS jitter (meters).
pub const JITTER_FLOOR_METERS: f64 = 5.0;
/// Eco-points per walked kilometer.
pub const POINTS_PER_KM: f64 = 10.0;
/// Upper bound on fixes per submitted trace.
pub const MAX_SAMPLES: usize = 20_000;

/// One GPS fix as reported by the browser geolocation API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GpsSample {
    pub lat: f64,
    pub lon: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl GpsSample {
    fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Result of checking a walking trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkAssessment {
    /// Distance from segments that passed both checks (meters)
    pub accepted_distance_meters: f64,
    /// Distance over every segment with increasing timestamps (meters)
    pub raw_distance_meters: f64,
    /// Time between first and last fix (seconds)
    pub duration_secs: i64,
    pub sample_count: u32,
    pub accepted_segments: u32,
}

impl WalkAssessment {
    /// Points earned: 10 per accepted kilometer, rounded down.
    pub fn points(&self) -> u32 {
        (self.accepted_distance_meters / 1000.0 * POINTS_PER_KM).floor() as u32
    }
}

/// Check that a submitted trace is well-formed.
pub fn validate_trace(samples: &[GpsSample]) -> Result<()> {
    if samples.len() < 2 {
        return Err(AppError::BadRequest(
            "A walk needs at least two GPS samples".to_string(),
        ));
    }
    if samples.len() > MAX_SAMPLES {
        return Err(AppError::BadRequest(format!(
            "A walk may contain at most {} GPS samples",
            MAX_SAMPLES
        )));
    }
    if let Some(bad) = samples.iter().position(|s| !s.is_valid()) {
        return Err(AppError::BadRequest(format!(
            "GPS sample {} has invalid coordinates",
            bad
        )));
    }
    if let Some(bad) = samples.iter().position(|s| s.timestamp_ms < 0) {
        return Err(AppError::BadRequest(format!(
            "GPS sample {} has a negative timestamp",
            bad
        )));
    }
    Ok(())
}

/// Submission key for a trace without a client-supplied one.
///
/// A trace is identified by its first fix, last fix and length, so
/// resubmitting the same recording maps to the same record.
pub fn trace_key(samples: &[GpsSample]) -> String {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => format!(
            "trace:{}:{}:{}:{:.6}:{:.6}",
            first.timestamp_ms,
            last.timestamp_ms,
            samples.len(),
            first.lat,
            first.lon
        ),
        _ => "trace:empty".to_string(),
    }
}

/// Walk the trace and sum the distance that looks like walking.
///
/// The anchor fix only advances once the displacement clears the jitter
/// floor, so slow but genuine movement is measured over a longer interval
/// instead of being discarded fix by fix. Segments with non-increasing
/// timestamps are ignored.
pub fn assess_trace(samples: &[GpsSample]) -> WalkAssessment {
    let mut assessment = WalkAssessment {
        sample_count: samples.len() as u32,
        ..Default::default()
    };

    let Some(first) = samples.first() else {
        return assessment;
    };
    if let Some(last) = samples.last() {
        assessment.duration_secs =
            last.timestamp_ms.saturating_sub(first.timestamp_ms).max(0) / 1000;
    }

    let mut anchor = *first;
    for sample in &samples[1..] {
        let elapsed_ms = sample.timestamp_ms.saturating_sub(anchor.timestamp_ms);
        if elapsed_ms <= 0 {
            continue;
        }

        let meters = Haversine.distance(anchor.point(), sample.point());
        if meters < JITTER_FLOOR_METERS {
            continue;
        }
        assessment.raw_distance_meters += meters;

        let speed_kmh = meters / (elapsed_ms as f64 / 1000.0) * 3.6;
        if (MIN_WALKING_SPEED_KMH..=MAX_WALKING_SPEED_KMH).contains(&speed_kmh) {
            assessment.accepted_distance_meters += meters;
            assessment.accepted_segments += 1;
        }

        anchor = *sample;
    }

    assessment
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tree photo verification.
//!
//! The client sends an RGBA8 pixel sample of the photo (as read from a
//! canvas) together with the GPS fix where it was taken. The photo is
//! classified either by the green-dominance heuristic or, when configured,
//! by a remote classifier.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ActivityRecord, Measurement};

/// Days a planted tree stays pending before it is verified.
pub const MATURATION_DAYS: i64 = 30;
/// Eco-points for a verified tree.
pub const TREE_POINTS: u32 = 100;
/// Green must exceed red and blue by this much for a pixel to count.
pub const GREEN_MARGIN: u8 = 20;
/// Share of green pixels needed to accept a photo.
pub const GREEN_RATIO_THRESHOLD: f64 = 0.15;
/// Trees closer than this to one of the account's trees are duplicates.
pub const DUPLICATE_RADIUS_METERS: f64 = 10.0;
/// Largest accepted pixel sample (width × height). Its base64 payload has to
/// fit the router's default 2 MiB request body limit.
pub const MAX_PIXELS: u64 = 512 * 512;
/// Edge of a tree site cell in degrees (about 11 m of latitude).
pub const SITE_CELL_DEGREES: f64 = 1e-4;

/// Decoded RGBA8 pixel sample.
#[derive(Debug, Clone)]
pub struct PixelSample {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelSample {
    /// Decode and size-check a base64 RGBA8 buffer.
    pub fn from_base64(width: u32, height: u32, data: &str) -> Result<Self> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels == 0 || pixels > MAX_PIXELS {
            return Err(AppError::BadRequest(format!(
                "Image must have between 1 and {} pixels",
                MAX_PIXELS
            )));
        }

        let rgba = STANDARD
            .decode(data.trim())
            .map_err(|_| AppError::BadRequest("Image data is not valid base64".to_string()))?;

        if rgba.len() as u64 != pixels * 4 {
            return Err(AppError::BadRequest(format!(
                "Image data has {} bytes, expected {} for {}x{} RGBA",
                rgba.len(),
                pixels * 4,
                width,
                height
            )));
        }

        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Share of pixels whose green channel dominates red and blue.
    pub fn green_ratio(&self) -> f64 {
        let total = self.rgba.len() / 4;
        if total == 0 {
            return 0.0;
        }
        let green = self
            .rgba
            .chunks_exact(4)
            .filter(|px| is_green(px[0], px[1], px[2]))
            .count();
        green as f64 / total as f64
    }
}

fn is_green(r: u8, g: u8, b: u8) -> bool {
    g > r.saturating_add(GREEN_MARGIN) && g > b.saturating_add(GREEN_MARGIN)
}

/// Outcome of classifying a photo.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub vegetation: bool,
    pub green_ratio: Option<f64>,
    /// "heuristic" or "remote"
    pub classifier: &'static str,
}

/// Response body expected from a remote classifier.
#[derive(Debug, Deserialize)]
struct RemoteClassification {
    vegetation: bool,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    image: &'a str,
    width: u32,
    height: u32,
}

/// Photo classifier for tree submissions.
#[derive(Clone)]
pub enum TreeClassifier {
    /// Local green-dominance heuristic.
    Heuristic,
    /// Delegated image classification over HTTP.
    Remote { client: reqwest::Client, url: String },
}

impl TreeClassifier {
    pub fn from_config(config: &Config) -> Self {
        match &config.classifier_url {
            Some(url) => {
                tracing::info!(url = %url, "Using remote tree classifier");
                let client = reqwest::Client::builder()
                    .timeout(std::time::Duration::from_secs(15))
                    .build()
                    .unwrap_or_default();
                TreeClassifier::Remote {
                    client,
                    url: url.clone(),
                }
            }
            None => TreeClassifier::Heuristic,
        }
    }

    /// Classify a pixel sample. `encoded` is the original base64 payload,
    /// forwarded as-is to a remote classifier.
    pub async fn classify(&self, sample: &PixelSample, encoded: &str) -> Result<Classification> {
        match self {
            TreeClassifier::Heuristic => {
                let ratio = sample.green_ratio();
                Ok(Classification {
                    vegetation: ratio >= GREEN_RATIO_THRESHOLD,
                    green_ratio: Some(ratio),
                    classifier: "heuristic",
                })
            }
            TreeClassifier::Remote { client, url } => {
                let response = client
                    .post(url)
                    .json(&RemoteRequest {
                        image: encoded,
                        width: sample.width,
                        height: sample.height,
                    })
                    .send()
                    .await
                    .map_err(|e| AppError::Upstream(format!("Classifier unreachable: {}", e)))?;

                if !response.status().is_success() {
                    return Err(AppError::Upstream(format!(
                        "Classifier returned {}",
                        response.status()
                    )));
                }

                let result: RemoteClassification = response.json().await.map_err(|e| {
                    AppError::Upstream(format!("Invalid classifier response: {}", e))
                })?;

                tracing::debug!(
                    vegetation = result.vegetation,
                    confidence = ?result.confidence,
                    "Remote classification"
                );

                Ok(Classification {
                    vegetation: result.vegetation,
                    green_ratio: None,
                    classifier: "remote",
                })
            }
        }
    }
}

/// Whether `(lat, lon)` lies within the duplicate radius of any of the given
/// tree records.
pub fn is_duplicate_location(existing: &[ActivityRecord], lat: f64, lon: f64) -> bool {
    let here = Point::new(lon, lat);
    existing.iter().any(|record| match record.measurement {
        Measurement::Tree { lat, lon, .. } => {
            Haversine.distance(here, Point::new(lon, lat)) < DUPLICATE_RADIUS_METERS
        }
        _ => false,
    })
}

/// Site cell of a tree location for an account.
pub fn site_id(account_id: &str, lat: f64, lon: f64) -> String {
    let row = (lat / SITE_CELL_DEGREES).floor() as i64;
    let col = (lon / SITE_CELL_DEGREES).floor() as i64;
    format!("{}_{}_{}", account_id, row, col)
}

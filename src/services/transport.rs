// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public transport tickets: geocoding search, route distance, fares.
//!
//! Talks to a Nominatim-compatible search API and an OSRM-compatible
//! routing API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Fare per route kilometer (₹).
pub const FARE_PER_KM: f64 = 6.0;
/// Eco-points per route kilometer.
pub const POINTS_PER_KM: f64 = 5.0;
/// Search queries shorter than this return nothing.
pub const MIN_QUERY_LEN: usize = 3;
/// Maximum search results returned.
pub const MAX_PLACES: usize = 5;

/// A point on the map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A geocoding search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Place {
    pub display_name: String,
    /// Nominatim returns coordinates as strings
    pub lat: String,
    pub lon: String,
}

/// Ticket payload a client encodes into a QR code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Ticket {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
    /// Fare in whole rupees
    pub fare: u32,
    pub eco_points: u32,
    pub issued_at: String,
}

/// Fare for a route length, rounded to the nearest rupee.
pub fn fare_for(distance_km: f64) -> u32 {
    (distance_km * FARE_PER_KM).round() as u32
}

/// Eco-points for a route length, rounded to the nearest point.
pub fn points_for(distance_km: f64) -> u32 {
    (distance_km * POINTS_PER_KM).round() as u32
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    /// Meters
    distance: f64,
}

/// Client for the routing and geocoding services.
#[derive(Clone)]
pub struct RoutingService {
    client: reqwest::Client,
    routing_base_url: String,
    geocoding_base_url: String,
}

impl RoutingService {
    pub fn new(routing_base_url: &str, geocoding_base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ecotrack/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            routing_base_url: routing_base_url.trim_end_matches('/').to_string(),
            geocoding_base_url: geocoding_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.routing_base_url, &config.geocoding_base_url)
    }

    /// Search for places matching a free-text query.
    pub async fn search_places(&self, query: &str) -> Result<Vec<Place>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/search?format=json&limit={}&q={}",
            self.geocoding_base_url,
            MAX_PLACES,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Geocoding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Geocoding returned {}",
                response.status()
            )));
        }

        let mut places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid geocoding response: {}", e)))?;
        places.truncate(MAX_PLACES);
        Ok(places)
    }

    /// Road distance between two points in kilometers.
    pub async fn route_distance_km(&self, from: Coordinate, to: Coordinate) -> Result<f64> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false",
            self.routing_base_url, from.lon, from.lat, to.lon, to.lat
        );

        tracing::debug!(url = %url, "Requesting route");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Routing request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Routing returned {}",
                response.status()
            )));
        }

        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid routing response: {}", e)))?;

        if body.code != "Ok" {
            return Err(AppError::Upstream(format!("Routing failed: {}", body.code)));
        }

        body.routes
            .first()
            .map(|r| r.distance / 1000.0)
            .ok_or_else(|| AppError::Upstream("Routing returned no routes".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_and_points() {
        assert_eq!(fare_for(10.0), 60);
        assert_eq!(points_for(10.0), 50);
        // 2.35 km: ₹14.1 → 14, 11.75 pts → 12
        assert_eq!(fare_for(2.35), 14);
        assert_eq!(points_for(2.35), 12);
        assert_eq!(fare_for(0.0), 0);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate { lat: 19.07, lon: 72.87 }.is_valid());
        assert!(!Coordinate { lat: 91.0, lon: 0.0 }.is_valid());
        assert!(!Coordinate { lat: 0.0, lon: f64::INFINITY }.is_valid());
    }

    #[tokio::test]
    async fn test_short_query_skips_request() {
        // Unroutable base URL: any request would fail
        let service = RoutingService::new("http://127.0.0.1:9", "http://127.0.0.1:9");
        let places = service.search_places("ab").await.unwrap();
        assert!(places.is_empty());
    }
}

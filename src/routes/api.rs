// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::ActivityFilter;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityKind, ActivityRecord, Measurement, PointBalance};
use crate::services::transport::Place;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_ACTIVITY_LIMIT: u32 = 50;
const MAX_ACTIVITY_LIMIT: u32 = 100;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/points", get(get_points))
        .route("/api/activities", get(get_activities))
        .route("/api/places", get(search_places))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let account = state
        .db
        .get_account(&user.account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.account_id)))?;

    Ok(Json(UserResponse {
        id: account.account_id,
        name: account.name,
        email: account.email,
        created_at: format_utc_rfc3339(account.created_at),
    }))
}

// ─── Points ──────────────────────────────────────────────────

/// Point balance response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PointsResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub earned: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub spent: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub available: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, number>"))]
    pub by_kind: HashMap<String, u64>,
    pub verified_by_kind: HashMap<String, u32>,
}

impl From<PointBalance> for PointsResponse {
    fn from(balance: PointBalance) -> Self {
        Self {
            available: balance.available_points(),
            earned: balance.earned_points,
            spent: balance.spent_points,
            by_kind: balance.points_by_kind,
            verified_by_kind: balance.verified_by_kind,
        }
    }
}

/// Get the current point balance. Trees past their maturation window are
/// credited first.
async fn get_points(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PointsResponse>> {
    let balance = state
        .activities
        .balance(&user.account_id, chrono::Utc::now())
        .await?;
    Ok(Json(balance.into()))
}

// ─── Activity History ────────────────────────────────────────

#[derive(Deserialize)]
pub struct ActivitiesQuery {
    kind: Option<String>,
    limit: Option<u32>,
}

/// One activity record as shown in the history.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    pub id: String,
    pub kind: ActivityKind,
    pub status: String,
    pub points: u32,
    pub measurement: Measurement,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
    pub matures_at: Option<String>,
}

impl From<ActivityRecord> for ActivitySummary {
    fn from(record: ActivityRecord) -> Self {
        Self {
            id: record.activity_id,
            kind: record.kind,
            status: record.status.as_str().to_string(),
            points: record.points,
            measurement: record.measurement,
            rejection_reason: record.rejection_reason,
            created_at: format_utc_rfc3339(record.created_at),
            resolved_at: record.resolved_at.map(format_utc_rfc3339),
            matures_at: record.matures_at.map(format_utc_rfc3339),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivitySummary>,
}

/// List the account's activity records, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<ActivityKind>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);

    let records = state
        .db
        .list_activities(&user.account_id, ActivityFilter { kind, status: None }, limit)
        .await?;

    Ok(Json(ActivitiesResponse {
        activities: records.into_iter().map(ActivitySummary::from).collect(),
    }))
}

// ─── Place Search ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PlacesQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlacesResponse {
    pub places: Vec<Place>,
}

/// Search boarding points and destinations by name.
async fn search_places(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlacesQuery>,
) -> Result<Json<PlacesResponse>> {
    let places = state.routing.search_places(&query.q).await?;
    Ok(Json(PlacesResponse { places }))
}

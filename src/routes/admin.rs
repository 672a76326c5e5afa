// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only admin overview.

use crate::error::Result;
use crate::middleware::admin::require_admin;
use crate::services::admin::{platform_overview, PlatformTotals};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Admin routes, guarded by `require_admin`. Merge inside the
/// authenticated router.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/overview", get(overview))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OverviewResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_users: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub walks_verified: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub trees_planted: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub rides_verified: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub bottles_recycled: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points_earned: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points_spent: u64,
    /// Latest rejected submissions (implausible walks, duplicate trees, ...)
    pub alerts: Vec<Alert>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Alert {
    pub activity_id: String,
    pub account_id: String,
    pub kind: String,
    pub reason: String,
    pub created_at: String,
}

async fn overview(State(state): State<Arc<AppState>>) -> Result<Json<OverviewResponse>> {
    let (totals, rejections) = platform_overview(&state.db).await?;
    let PlatformTotals {
        total_users,
        walks_verified,
        trees_planted,
        rides_verified,
        bottles_recycled,
        points_earned,
        points_spent,
    } = totals;

    let alerts = rejections
        .into_iter()
        .map(|record| Alert {
            kind: record.kind.as_str().to_string(),
            reason: record.rejection_reason.unwrap_or_default(),
            created_at: format_utc_rfc3339(record.created_at),
            activity_id: record.activity_id,
            account_id: record.account_id,
        })
        .collect();

    Ok(Json(OverviewResponse {
        total_users,
        walks_verified,
        trees_planted,
        rides_verified,
        bottles_recycled,
        points_earned,
        points_spent,
        alerts,
    }))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity submission routes, one per activity kind.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::api::ActivitySummary;
use crate::routes::auth::json_body;
use crate::services::transport::{Coordinate, Ticket};
use crate::services::walk::GpsSample;
use crate::services::{TransportSubmission, TreeSubmission};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities/walk", post(submit_walk))
        .route("/api/activities/tree", post(submit_tree))
        .route("/api/activities/tree/{id}/mature", post(mature_tree))
        .route("/api/activities/transport", post(submit_transport))
        .route("/api/activities/plastic", post(redeem_bottle))
}

/// Result of a submission: the stored record and the balance afterwards.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubmissionResponse {
    pub activity: ActivitySummary,
    /// Points credited by this submission (0 unless verified)
    pub points_awarded: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub available_points: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
}

async fn respond(
    state: &AppState,
    account_id: &str,
    record: crate::models::ActivityRecord,
    ticket: Option<Ticket>,
) -> Result<Json<SubmissionResponse>> {
    let balance = state.db.get_balance(account_id).await?.unwrap_or_default();
    let points_awarded = match record.status {
        crate::models::VerificationStatus::Verified => record.points,
        _ => 0,
    };
    Ok(Json(SubmissionResponse {
        activity: record.into(),
        points_awarded,
        available_points: balance.available_points(),
        ticket,
    }))
}

/// Submission key from the body, else from the `Idempotency-Key` header.
fn idempotency_key(from_body: Option<String>, headers: &HeaderMap) -> Option<String> {
    from_body.or_else(|| {
        headers
            .get("Idempotency-Key")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    })
}

// ─── Walking ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct WalkRequest {
    pub samples: Vec<GpsSample>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

async fn submit_walk(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    body: std::result::Result<Json<WalkRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>> {
    let request = json_body(body)?;
    let key = idempotency_key(request.idempotency_key, &headers);
    let record = state
        .activities
        .submit_walk(
            &user.account_id,
            &request.samples,
            key.as_deref(),
            chrono::Utc::now(),
        )
        .await?;
    respond(&state, &user.account_id, record, None).await
}

// ─── Trees ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TreeRequest {
    pub lat: f64,
    pub lon: f64,
    pub width: u32,
    pub height: u32,
    /// Base64 RGBA8 pixels of the downscaled photo
    pub image: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

async fn submit_tree(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    body: std::result::Result<Json<TreeRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>> {
    let request = json_body(body)?;
    let submission = TreeSubmission {
        lat: request.lat,
        lon: request.lon,
        width: request.width,
        height: request.height,
        image: request.image,
        idempotency_key: idempotency_key(request.idempotency_key, &headers),
    };
    let record = state
        .activities
        .submit_tree(&user.account_id, &submission, chrono::Utc::now())
        .await?;
    respond(&state, &user.account_id, record, None).await
}

async fn mature_tree(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<String>,
) -> Result<Json<SubmissionResponse>> {
    let record = state
        .activities
        .mature_tree(&user.account_id, &activity_id, chrono::Utc::now())
        .await?;
    respond(&state, &user.account_id, record, None).await
}

// ─── Transport ───────────────────────────────────────────────

/// A named stop chosen from place search.
#[derive(Deserialize)]
pub struct Stop {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
pub struct TransportRequest {
    pub from: Stop,
    pub to: Stop,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

async fn submit_transport(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    body: std::result::Result<Json<TransportRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>> {
    let request = json_body(body)?;
    if request.from.name.trim().is_empty() || request.to.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Boarding point and destination are required".to_string(),
        ));
    }

    let submission = TransportSubmission {
        from_name: request.from.name,
        to_name: request.to.name,
        from: Coordinate {
            lat: request.from.lat,
            lon: request.from.lon,
        },
        to: Coordinate {
            lat: request.to.lat,
            lon: request.to.lon,
        },
        idempotency_key: idempotency_key(request.idempotency_key, &headers),
    };
    let (record, ticket) = state
        .activities
        .submit_transport(&user.account_id, &submission, chrono::Utc::now())
        .await?;
    respond(&state, &user.account_id, record, ticket).await
}

// ─── Plastic ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PlasticRequest {
    pub code: String,
}

async fn redeem_bottle(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<PlasticRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>> {
    let request = json_body(body)?;
    let record = state
        .activities
        .redeem_bottle(&user.account_id, &request.code, chrono::Utc::now())
        .await?;
    respond(&state, &user.account_id, record, None).await
}

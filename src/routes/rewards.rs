// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward catalog and claim routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::reward::CATALOG;
use crate::models::{Reward, RewardClaim};
use crate::services::rewards;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rewards", get(list_rewards))
        .route("/api/rewards/claims", get(list_claims))
        .route("/api/rewards/{id}/claim", post(claim_reward))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RewardEntry {
    #[serde(flatten)]
    pub reward: Reward,
    /// Claimable now with the current balance
    pub affordable: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RewardsResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub available_points: u64,
    pub rewards: Vec<RewardEntry>,
}

/// List the catalog, marking what the account can afford.
async fn list_rewards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RewardsResponse>> {
    let available_points = state
        .activities
        .balance(&user.account_id, chrono::Utc::now())
        .await?
        .available_points();

    let rewards = CATALOG
        .iter()
        .map(|reward| RewardEntry {
            reward: reward.clone(),
            affordable: reward.available && reward.points <= available_points,
        })
        .collect();

    Ok(Json(RewardsResponse {
        available_points,
        rewards,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClaimSummary {
    pub id: String,
    pub reward_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points_spent: u64,
    pub voucher_code: String,
    pub claimed_at: String,
}

impl From<RewardClaim> for ClaimSummary {
    fn from(claim: RewardClaim) -> Self {
        Self {
            id: claim.claim_id,
            reward_id: claim.reward_id,
            points_spent: claim.points_spent,
            voucher_code: claim.voucher_code,
            claimed_at: format_utc_rfc3339(claim.claimed_at),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClaimResponse {
    pub claim: ClaimSummary,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub available_points: u64,
}

/// Claim a reward, debiting its price from the balance.
async fn claim_reward(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(reward_id): Path<String>,
) -> Result<(StatusCode, Json<ClaimResponse>)> {
    let now = chrono::Utc::now();
    // Credit any due trees so they count toward this claim
    state.activities.mature_due_trees(&user.account_id, now).await?;

    let (claim, balance) = rewards::claim_reward(&state.db, &user.account_id, &reward_id, now).await?;

    Ok((
        StatusCode::CREATED,
        Json(ClaimResponse {
            claim: claim.into(),
            available_points: balance.available_points(),
        }),
    ))
}

#[derive(Serialize)]
pub struct ClaimsResponse {
    pub claims: Vec<ClaimSummary>,
}

/// List the account's past reward claims.
async fn list_claims(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ClaimsResponse>> {
    let claims = state.db.list_reward_claims(&user.account_id).await?;
    Ok(Json(ClaimsResponse {
        claims: claims.into_iter().map(ClaimSummary::from).collect(),
    }))
}

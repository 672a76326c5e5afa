// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward claims paid from the point balance.

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::reward::find_reward;
use crate::models::{PointBalance, RewardClaim};

/// Claim a catalog reward for an account.
///
/// Returns the stored claim and the balance after the debit.
pub async fn claim_reward(
    db: &Database,
    account_id: &str,
    reward_id: &str,
    now: DateTime<Utc>,
) -> Result<(RewardClaim, PointBalance)> {
    let reward = find_reward(reward_id)
        .ok_or_else(|| AppError::NotFound(format!("Reward {} not found", reward_id)))?;

    if !reward.available {
        return Err(AppError::BadRequest(format!(
            "Reward {} is not available yet",
            reward_id
        )));
    }

    let claim = RewardClaim::new(account_id, reward, now);
    let balance = db.claim_reward(reward, &claim).await?;

    tracing::info!(
        account_id,
        reward_id,
        points = reward.points,
        remaining = balance.available_points(),
        "Reward claimed"
    );

    Ok((claim, balance))
}

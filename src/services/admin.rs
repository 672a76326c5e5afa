// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform-wide totals for the admin overview.

use crate::db::Database;
use crate::error::Result;
use crate::models::{ActivityKind, ActivityRecord, PointBalance};

/// Rejections listed as alerts.
pub const ALERT_LIMIT: u32 = 10;

/// Totals across every account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformTotals {
    pub total_users: u64,
    pub walks_verified: u64,
    pub trees_planted: u64,
    pub rides_verified: u64,
    pub bottles_recycled: u64,
    pub points_earned: u64,
    pub points_spent: u64,
}

impl PlatformTotals {
    /// Sum balance aggregates. Verified counts come from `verified_by_kind`,
    /// so a tree counts once it has matured.
    pub fn from_balances(total_users: u64, balances: &[PointBalance]) -> Self {
        let verified = |balance: &PointBalance, kind: ActivityKind| {
            u64::from(
                balance
                    .verified_by_kind
                    .get(kind.as_str())
                    .copied()
                    .unwrap_or(0),
            )
        };

        balances.iter().fold(
            Self {
                total_users,
                ..Default::default()
            },
            |mut totals, balance| {
                totals.walks_verified += verified(balance, ActivityKind::Walk);
                totals.trees_planted += verified(balance, ActivityKind::Tree);
                totals.rides_verified += verified(balance, ActivityKind::Transport);
                totals.bottles_recycled += verified(balance, ActivityKind::Plastic);
                totals.points_earned += balance.earned_points;
                totals.points_spent += balance.spent_points;
                totals
            },
        )
    }
}

/// Platform totals plus the latest rejected submissions.
pub async fn platform_overview(db: &Database) -> Result<(PlatformTotals, Vec<ActivityRecord>)> {
    let total_users = db.count_accounts().await?;
    let balances = db.list_balances().await?;
    let alerts = db.recent_rejections(ALERT_LIMIT).await?;

    let totals = PlatformTotals::from_balances(total_users, &balances);
    tracing::debug!(
        total_users,
        balances = balances.len(),
        alerts = alerts.len(),
        "Built platform overview"
    );
    Ok((totals, alerts))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Reward catalog, reward claims, and bottle redemption codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A reward that can be bought with eco-points.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Reward {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub points: u64,
    pub category: &'static str,
    /// Unavailable rewards are listed but cannot be claimed
    pub available: bool,
}

/// The reward catalog.
pub const CATALOG: &[Reward] = &[
    Reward {
        id: "gift-card-100",
        title: "₹100 Gift Card",
        description: "Redeem at any partner store",
        points: 500,
        category: "Gift Cards",
        available: true,
    },
    Reward {
        id: "bus-day-pass",
        title: "Free Bus Day Pass",
        description: "Unlimited rides for 24 hours",
        points: 300,
        category: "Transport",
        available: true,
    },
    Reward {
        id: "eco-products-20",
        title: "20% Off Eco Products",
        description: "Valid on sustainable brands",
        points: 200,
        category: "Discounts",
        available: true,
    },
    Reward {
        id: "tree-certificate",
        title: "Plant a Tree Certificate",
        description: "We plant a tree in your name",
        points: 750,
        category: "Eco Impact",
        available: true,
    },
    Reward {
        id: "gift-card-500",
        title: "₹500 Gift Card",
        description: "Premium partner stores",
        points: 2000,
        category: "Gift Cards",
        available: false,
    },
    Reward {
        id: "monthly-bus-pass",
        title: "Monthly Bus Pass",
        description: "Unlimited rides for 30 days",
        points: 5000,
        category: "Transport",
        available: false,
    },
];

/// Look up a reward by ID.
pub fn find_reward(id: &str) -> Option<&'static Reward> {
    CATALOG.iter().find(|r| r.id == id)
}

/// A claimed reward, stored in `reward_claims`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardClaim {
    pub claim_id: String,
    pub account_id: String,
    pub reward_id: String,
    pub points_spent: u64,
    /// Voucher code shown to the user
    pub voucher_code: String,
    pub claimed_at: DateTime<Utc>,
}

impl RewardClaim {
    pub fn new(account_id: &str, reward: &Reward, now: DateTime<Utc>) -> Self {
        let claim_id = uuid::Uuid::new_v4().simple().to_string();
        // Voucher: reward prefix + first 8 hex chars of the claim ID
        let prefix: String = reward
            .id
            .split('-')
            .filter_map(|part| part.chars().next())
            .collect::<String>()
            .to_uppercase();
        let voucher_code = format!("{}{}", prefix, claim_id[..8].to_uppercase());

        Self {
            claim_id,
            account_id: account_id.to_string(),
            reward_id: reward.id.to_string(),
            points_spent: reward.points,
            voucher_code,
            claimed_at: now,
        }
    }
}

/// A redeemed bottle code, stored in `redemption_codes` keyed by the code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionCode {
    pub code: String,
    pub redeemed_by: String,
    /// The activity record the code was credited through
    pub activity_id: String,
    pub redeemed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_unique() {
        let mut ids: Vec<&str> = CATALOG.iter().map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn test_find_reward() {
        assert_eq!(find_reward("bus-day-pass").map(|r| r.points), Some(300));
        assert!(find_reward("yacht").is_none());
    }

    #[test]
    fn test_claim_voucher_code() {
        let reward = find_reward("gift-card-100").unwrap();
        let claim = RewardClaim::new("acct-1", reward, Utc::now());
        assert!(claim.voucher_code.starts_with("GC1"));
        assert_eq!(claim.voucher_code.len(), 11);
        assert_eq!(claim.points_spent, 500);
    }
}

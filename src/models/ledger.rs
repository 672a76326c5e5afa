//! Point balance aggregate for an account.
//!
//! The balance is updated in the same transaction that verifies an activity
//! record, so reading it is O(1) instead of summing every record.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::models::{ActivityRecord, VerificationStatus};

/// Pre-computed point balance for an account.
///
/// Stored at: `balances/{account_id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointBalance {
    // ─── Totals ──────────────────────────────────────────────────
    /// Sum of points of every credited (verified) activity record
    #[serde(default)]
    pub earned_points: u64,
    /// Sum of points spent on reward claims
    #[serde(default)]
    pub spent_points: u64,

    // ─── By Kind ─────────────────────────────────────────────────
    /// Points earned per activity kind ("walk", "tree", ...)
    #[serde(default)]
    pub points_by_kind: HashMap<String, u64>,
    /// Verified record count per activity kind
    #[serde(default)]
    pub verified_by_kind: HashMap<String, u32>,

    // ─── Idempotency ─────────────────────────────────────────────
    /// Most recently credited activity IDs, oldest first. Bounded so the
    /// document stays small; older records are guarded by their stored status.
    #[serde(default, alias = "credited_activity_ids")]
    pub recent_activity_ids: VecDeque<String>,

    // ─── Metadata ────────────────────────────────────────────────
    /// Last update timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

/// How many credited activity IDs a balance remembers.
pub const RECENT_CREDIT_WINDOW: usize = 200;

/// A reward claim asked for more points than are available.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Insufficient points: {available} available, {required} required")]
pub struct InsufficientPoints {
    pub available: u64,
    pub required: u64,
}

impl PointBalance {
    /// Points that can still be spent.
    pub fn available_points(&self) -> u64 {
        self.earned_points.saturating_sub(self.spent_points)
    }

    /// Whether `activity_id` is among the recently credited records.
    pub fn recently_credited(&self, activity_id: &str) -> bool {
        self.recent_activity_ids.iter().any(|id| id == activity_id)
    }

    /// Credit a verified activity record.
    ///
    /// Returns `true` if the record was credited (new).
    /// Returns `false` if it was already credited or is not verified.
    pub fn credit(&mut self, record: &ActivityRecord, now: &str) -> bool {
        if record.status != VerificationStatus::Verified {
            return false;
        }

        // Idempotency check: skip if already credited
        if self.recently_credited(&record.activity_id) {
            return false;
        }
        self.recent_activity_ids.push_back(record.activity_id.clone());
        while self.recent_activity_ids.len() > RECENT_CREDIT_WINDOW {
            self.recent_activity_ids.pop_front();
        }

        let points = u64::from(record.points);
        let kind = record.kind.as_str().to_string();

        self.earned_points += points;
        *self.points_by_kind.entry(kind.clone()).or_insert(0) += points;
        *self.verified_by_kind.entry(kind).or_insert(0) += 1;
        self.updated_at = now.to_string();

        true
    }

    /// Spend points on a reward. Never drives the available balance negative.
    pub fn debit(&mut self, points: u64, now: &str) -> Result<(), InsufficientPoints> {
        let available = self.available_points();
        if points > available {
            return Err(InsufficientPoints {
                available,
                required: points,
            });
        }
        self.spent_points += points;
        self.updated_at = now.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityKind, Measurement};
    use chrono::Utc;

    fn verified(kind: ActivityKind, points: u32) -> ActivityRecord {
        let measurement = match kind {
            ActivityKind::Plastic => Measurement::Plastic {
                code: "ABC123".to_string(),
            },
            _ => Measurement::Transport {
                from: "A".to_string(),
                to: "B".to_string(),
                distance_km: 2.0,
                fare: 12,
            },
        };
        let mut record = ActivityRecord::new("acct-1", kind, measurement, points, Utc::now());
        record.verify(Utc::now()).unwrap();
        record
    }

    #[test]
    fn test_credit_basic() {
        let mut balance = PointBalance::default();
        let record = verified(ActivityKind::Plastic, 15);

        assert!(balance.credit(&record, "2026-01-15T12:00:00Z"));
        assert_eq!(balance.earned_points, 15);
        assert_eq!(balance.available_points(), 15);
        assert_eq!(balance.points_by_kind.get("plastic"), Some(&15));
        assert_eq!(balance.verified_by_kind.get("plastic"), Some(&1));
        assert_eq!(balance.updated_at, "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_idempotency_skips_duplicate() {
        let mut balance = PointBalance::default();
        let record = verified(ActivityKind::Transport, 10);

        balance.credit(&record, "now");
        let credited_again = balance.credit(&record, "later");

        assert!(!credited_again);
        assert_eq!(balance.earned_points, 10); // Not incremented twice
        assert_eq!(balance.updated_at, "now");
    }

    #[test]
    fn test_pending_and_rejected_are_not_credited() {
        let mut balance = PointBalance::default();
        let pending = ActivityRecord::new(
            "acct-1",
            ActivityKind::Plastic,
            Measurement::Plastic {
                code: "ABC123".to_string(),
            },
            15,
            Utc::now(),
        );
        assert!(!balance.credit(&pending, "now"));

        let mut rejected = pending.clone();
        rejected.reject("bad code", Utc::now()).unwrap();
        assert!(!balance.credit(&rejected, "now"));

        assert_eq!(balance.earned_points, 0);
        assert!(balance.recent_activity_ids.is_empty());
    }

    #[test]
    fn test_earned_equals_sum_of_credited_records() {
        let mut balance = PointBalance::default();
        let records = vec![
            verified(ActivityKind::Plastic, 15),
            verified(ActivityKind::Transport, 25),
            verified(ActivityKind::Plastic, 15),
        ];

        for record in records.iter().chain(records.iter()) {
            balance.credit(record, "now");
        }

        let expected: u64 = records.iter().map(|r| u64::from(r.points)).sum();
        assert_eq!(balance.earned_points, expected);
        assert_eq!(balance.verified_by_kind.get("plastic"), Some(&2));
    }

    #[test]
    fn test_credited_ids_window_is_bounded() {
        let mut balance = PointBalance::default();
        let first = verified(ActivityKind::Plastic, 1);
        balance.credit(&first, "now");
        for _ in 0..RECENT_CREDIT_WINDOW {
            balance.credit(&verified(ActivityKind::Plastic, 1), "now");
        }

        assert_eq!(balance.recent_activity_ids.len(), RECENT_CREDIT_WINDOW);
        assert!(!balance.recently_credited(&first.activity_id));
        assert_eq!(balance.earned_points, RECENT_CREDIT_WINDOW as u64 + 1);
    }

    #[test]
    fn test_legacy_id_set_still_loads() {
        let balance: PointBalance = serde_json::from_value(serde_json::json!({
            "earned_points": 15,
            "credited_activity_ids": ["a1"]
        }))
        .unwrap();
        assert!(balance.recently_credited("a1"));
    }

    #[test]
    fn test_debit_respects_available_points() {
        let mut balance = PointBalance::default();
        balance.credit(&verified(ActivityKind::Transport, 300), "now");

        assert_eq!(
            balance.debit(500, "now"),
            Err(InsufficientPoints {
                available: 300,
                required: 500
            })
        );
        assert_eq!(balance.spent_points, 0);

        balance.debit(200, "now").unwrap();
        assert_eq!(balance.available_points(), 100);
        assert_eq!(balance.earned_points, 300);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity record model: one submission of an eco-friendly activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The four kinds of activity that earn eco-points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Walk,
    Tree,
    Transport,
    Plastic,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Walk => "walk",
            ActivityKind::Tree => "tree",
            ActivityKind::Transport => "transport",
            ActivityKind::Plastic => "plastic",
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walk" => Ok(ActivityKind::Walk),
            "tree" => Ok(ActivityKind::Tree),
            "transport" => Ok(ActivityKind::Transport),
            "plastic" => Ok(ActivityKind::Plastic),
            other => Err(format!("unknown activity kind '{}'", other)),
        }
    }
}

/// Verification status. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// Raw measurement captured for an activity, one shape per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measurement {
    Walk {
        /// Distance that passed the speed and jitter checks
        accepted_distance_meters: f64,
        /// Raw distance over all segments
        raw_distance_meters: f64,
        duration_secs: i64,
        sample_count: u32,
        accepted_segments: u32,
    },
    Tree {
        lat: f64,
        lon: f64,
        /// Share of green-dominant pixels (heuristic classifier only)
        green_ratio: Option<f64>,
        /// "heuristic" or "remote"
        classifier: String,
    },
    Transport {
        from: String,
        to: String,
        distance_km: f64,
        fare: u32,
    },
    Plastic {
        code: String,
    },
}

/// Stored activity record in the `activities` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Record ID (also the document ID and the ledger idempotency key).
    /// Random unless derived from a submission key with [`submission_id`].
    pub activity_id: String,
    /// Owning account
    pub account_id: String,
    pub kind: ActivityKind,
    pub measurement: Measurement,
    /// Points awarded once the record is verified
    pub points: u32,
    pub status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Earliest time a pending tree may be verified
    #[serde(default)]
    pub matures_at: Option<DateTime<Utc>>,
}

/// A location cell holding one of an account's trees.
///
/// Stored at: `tree_sites/{site_id}`. Created together with the pending
/// tree record, so two uploads for the same cell cannot both be accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSite {
    pub site_id: String,
    pub account_id: String,
    pub activity_id: String,
    pub claimed_at: DateTime<Utc>,
}

/// Record ID for a submission key.
///
/// The same account, kind and key always map to the same ID, so a retried
/// submission lands on the record (and ledger entry) of the first attempt.
pub fn submission_id(account_id: &str, kind: ActivityKind, key: &str) -> String {
    let name = format!("{}:{}:{}", account_id, kind.as_str(), key);
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// A status transition was attempted on an already-resolved record.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Activity {activity_id} is already {}", status.as_str())]
pub struct TransitionError {
    pub activity_id: String,
    pub status: VerificationStatus,
}

impl ActivityRecord {
    /// Create a new pending record.
    pub fn new(
        account_id: &str,
        kind: ActivityKind,
        measurement: Measurement,
        points: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            activity_id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            kind,
            measurement,
            points,
            status: VerificationStatus::Pending,
            rejection_reason: None,
            created_at: now,
            resolved_at: None,
            matures_at: None,
        }
    }

    /// Replace the random record ID.
    pub fn with_id(mut self, activity_id: String) -> Self {
        self.activity_id = activity_id;
        self
    }

    /// Move a pending record to `Verified`.
    pub fn verify(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.resolve(VerificationStatus::Verified, None, now)
    }

    /// Move a pending record to `Rejected`. Rejected records carry no points.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.resolve(VerificationStatus::Rejected, Some(reason.to_string()), now)?;
        self.points = 0;
        Ok(())
    }

    fn resolve(
        &mut self,
        status: VerificationStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status != VerificationStatus::Pending {
            return Err(TransitionError {
                activity_id: self.activity_id.clone(),
                status: self.status,
            });
        }
        self.status = status;
        self.rejection_reason = reason;
        self.resolved_at = Some(now);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == VerificationStatus::Pending
    }

    /// Whether a pending record's maturation window has elapsed.
    /// Records without a window are mature immediately.
    pub fn is_mature(&self, now: DateTime<Utc>) -> bool {
        self.matures_at.map_or(true, |at| now >= at)
    }
}

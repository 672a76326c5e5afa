// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity submission service.
//!
//! Handles the core workflow for every activity kind:
//! 1. Validate the raw submission
//! 2. Apply the kind's acceptance rule
//! 3. Build the activity record (verified, pending or rejected)
//! 4. Store it, crediting verified records to the ledger atomically

use chrono::{DateTime, Duration, Utc};

use crate::db::{ActivityFilter, CreditOutcome, Database};
use crate::error::{AppError, Result};
use crate::models::{
    submission_id, ActivityKind, ActivityRecord, Measurement, PointBalance, RedemptionCode,
    TreeSite, VerificationStatus,
};
use crate::services::plastic::{self, BOTTLE_POINTS};
use crate::services::transport::{self, Coordinate, RoutingService, Ticket};
use crate::services::tree::{self, PixelSample, TreeClassifier, MATURATION_DAYS, TREE_POINTS};
use crate::services::walk::{self, GpsSample};
use crate::time_utils::format_utc_rfc3339;

/// Upper bound on records scanned for per-account checks.
const SCAN_LIMIT: u32 = 1000;
/// Longest accepted client submission key.
pub const MAX_KEY_LEN: usize = 128;

/// A tree photo submission.
#[derive(Debug, Clone)]
pub struct TreeSubmission {
    pub lat: f64,
    pub lon: f64,
    pub width: u32,
    pub height: u32,
    /// Base64 RGBA8 pixels
    pub image: String,
    /// Client key making retries land on the same record
    pub idempotency_key: Option<String>,
}

/// A transport ticket request.
#[derive(Debug, Clone)]
pub struct TransportSubmission {
    pub from_name: String,
    pub to_name: String,
    pub from: Coordinate,
    pub to: Coordinate,
    /// Client key making retries land on the same record
    pub idempotency_key: Option<String>,
}

/// Check a client-supplied submission key.
fn check_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(AppError::BadRequest(format!(
            "Idempotency key must be 1-{} characters",
            MAX_KEY_LEN
        )));
    }
    Ok(key)
}

/// Ticket for a verified ride record.
fn ticket_for(record: &ActivityRecord) -> Option<Ticket> {
    if record.status != VerificationStatus::Verified {
        return None;
    }
    match &record.measurement {
        Measurement::Transport {
            from,
            to,
            distance_km,
            fare,
        } => Some(Ticket {
            from: from.clone(),
            to: to.clone(),
            distance_km: (distance_km * 100.0).round() / 100.0,
            fare: *fare,
            eco_points: record.points,
            issued_at: format_utc_rfc3339(record.resolved_at.unwrap_or(record.created_at)),
        }),
        _ => None,
    }
}

/// Verifies activity submissions and credits the ledger.
#[derive(Clone)]
pub struct ActivityService {
    db: Database,
    classifier: TreeClassifier,
    routing: RoutingService,
}

impl ActivityService {
    pub fn new(db: Database, classifier: TreeClassifier, routing: RoutingService) -> Self {
        Self {
            db,
            classifier,
            routing,
        }
    }

    // ─── Walking ─────────────────────────────────────────────────

    /// Verify a walking trace. Walks with accepted distance are credited
    /// immediately; traces with none are stored as rejected.
    ///
    /// Without a client key the trace itself is the key, so resubmitting a
    /// recording returns the stored record instead of crediting it again.
    pub async fn submit_walk(
        &self,
        account_id: &str,
        samples: &[GpsSample],
        key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ActivityRecord> {
        walk::validate_trace(samples)?;
        let key = match key {
            Some(key) => check_key(key)?.to_string(),
            None => walk::trace_key(samples),
        };
        let activity_id = submission_id(account_id, ActivityKind::Walk, &key);
        if let Some(stored) = self.replay(account_id, &activity_id).await? {
            return Ok(stored);
        }

        let assessment = walk::assess_trace(samples);

        tracing::info!(
            account_id,
            samples = assessment.sample_count,
            accepted_m = assessment.accepted_distance_meters,
            raw_m = assessment.raw_distance_meters,
            "Assessed walking trace"
        );

        let mut record = ActivityRecord::new(
            account_id,
            ActivityKind::Walk,
            Measurement::Walk {
                accepted_distance_meters: assessment.accepted_distance_meters,
                raw_distance_meters: assessment.raw_distance_meters,
                duration_secs: assessment.duration_secs,
                sample_count: assessment.sample_count,
                accepted_segments: assessment.accepted_segments,
            },
            assessment.points(),
            now,
        )
        .with_id(activity_id);

        if assessment.accepted_distance_meters > 0.0 {
            self.verify_and_credit(&mut record, now).await?;
        } else {
            self.reject_and_store(&mut record, "no valid walking distance", now)
                .await?;
        }
        Ok(record)
    }

    // ─── Trees ───────────────────────────────────────────────────

    /// Classify a tree photo. Accepted trees stay pending for the
    /// maturation window; rejected photos are stored with a reason.
    pub async fn submit_tree(
        &self,
        account_id: &str,
        submission: &TreeSubmission,
        now: DateTime<Utc>,
    ) -> Result<ActivityRecord> {
        let location = Coordinate {
            lat: submission.lat,
            lon: submission.lon,
        };
        if !location.is_valid() {
            return Err(AppError::BadRequest(
                "Tree location has invalid coordinates".to_string(),
            ));
        }

        let activity_id = match &submission.idempotency_key {
            Some(key) => Some(submission_id(account_id, ActivityKind::Tree, check_key(key)?)),
            None => None,
        };
        if let Some(id) = &activity_id {
            if let Some(stored) = self.replay(account_id, id).await? {
                return Ok(stored);
            }
        }

        let sample =
            PixelSample::from_base64(submission.width, submission.height, &submission.image)?;
        let classification = self.classifier.classify(&sample, &submission.image).await?;

        let mut record = ActivityRecord::new(
            account_id,
            ActivityKind::Tree,
            Measurement::Tree {
                lat: submission.lat,
                lon: submission.lon,
                green_ratio: classification.green_ratio,
                classifier: classification.classifier.to_string(),
            },
            TREE_POINTS,
            now,
        );
        if let Some(id) = activity_id {
            record = record.with_id(id);
        }

        if !classification.vegetation {
            tracing::info!(
                account_id,
                green_ratio = ?classification.green_ratio,
                "No vegetation detected in tree photo"
            );
            self.reject_and_store(&mut record, "no vegetation detected", now)
                .await?;
            return Ok(record);
        }

        let existing: Vec<ActivityRecord> = self
            .db
            .list_activities(
                account_id,
                ActivityFilter {
                    kind: Some(ActivityKind::Tree),
                    status: None,
                },
                SCAN_LIMIT,
            )
            .await?
            .into_iter()
            .filter(|r| r.status != VerificationStatus::Rejected)
            .collect();

        if tree::is_duplicate_location(&existing, submission.lat, submission.lon) {
            tracing::warn!(account_id, "Duplicate location detected for tree upload");
            self.reject_and_store(&mut record, "duplicate tree location", now)
                .await?;
            return Ok(record);
        }

        // The scan above sees neighbours in other cells; the site claim makes
        // concurrent uploads for the same cell exclusive.
        record.matures_at = Some(now + Duration::days(MATURATION_DAYS));
        let site = TreeSite {
            site_id: tree::site_id(account_id, submission.lat, submission.lon),
            account_id: account_id.to_string(),
            activity_id: record.activity_id.clone(),
            claimed_at: now,
        };
        if !self.plant_or_replay(&mut record, &site).await? {
            tracing::warn!(account_id, site_id = %site.site_id, "Tree site already held");
            record.matures_at = None;
            self.reject_and_store(&mut record, "duplicate tree location", now)
                .await?;
            return Ok(record);
        }

        tracing::info!(
            account_id,
            activity_id = %record.activity_id,
            "Tree accepted, verification pending"
        );
        Ok(record)
    }

    /// Verify a pending tree whose maturation window has elapsed.
    ///
    /// Already-resolved trees are returned unchanged, so retries are safe.
    pub async fn mature_tree(
        &self,
        account_id: &str,
        activity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ActivityRecord> {
        let mut record = self
            .db
            .get_activity(activity_id)
            .await?
            .filter(|r| r.account_id == account_id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;

        if record.kind != ActivityKind::Tree {
            return Err(AppError::BadRequest(format!(
                "Activity {} is not a tree",
                activity_id
            )));
        }
        if !record.is_pending() {
            return Ok(record);
        }
        if !record.is_mature(now) {
            let until = record.matures_at.map(format_utc_rfc3339).unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "Tree is still maturing until {}",
                until
            )));
        }

        self.verify_and_credit(&mut record, now).await?;
        Ok(record)
    }

    /// Verify every pending tree of the account whose window has elapsed.
    /// Returns the number of trees credited.
    pub async fn mature_due_trees(&self, account_id: &str, now: DateTime<Utc>) -> Result<u32> {
        let pending = self
            .db
            .list_activities(
                account_id,
                ActivityFilter {
                    kind: Some(ActivityKind::Tree),
                    status: Some(VerificationStatus::Pending),
                },
                SCAN_LIMIT,
            )
            .await?;

        let mut credited = 0;
        for mut record in pending.into_iter().filter(|r| r.is_mature(now)) {
            if self.verify_and_credit(&mut record, now).await? == CreditOutcome::Credited {
                credited += 1;
            }
        }

        if credited > 0 {
            tracing::info!(account_id, credited, "Matured pending trees");
        }
        Ok(credited)
    }

    // ─── Transport ───────────────────────────────────────────────

    /// Price a ride and credit its eco-points. The ticket is only issued
    /// for verified rides.
    pub async fn submit_transport(
        &self,
        account_id: &str,
        submission: &TransportSubmission,
        now: DateTime<Utc>,
    ) -> Result<(ActivityRecord, Option<Ticket>)> {
        if !submission.from.is_valid() || !submission.to.is_valid() {
            return Err(AppError::BadRequest(
                "Boarding point and destination need valid coordinates".to_string(),
            ));
        }

        let activity_id = match &submission.idempotency_key {
            Some(key) => Some(submission_id(
                account_id,
                ActivityKind::Transport,
                check_key(key)?,
            )),
            None => None,
        };
        if let Some(id) = &activity_id {
            if let Some(stored) = self.replay(account_id, id).await? {
                let ticket = ticket_for(&stored);
                return Ok((stored, ticket));
            }
        }

        let distance_km = self
            .routing
            .route_distance_km(submission.from, submission.to)
            .await?;
        let fare = transport::fare_for(distance_km);
        let points = transport::points_for(distance_km);

        let mut record = ActivityRecord::new(
            account_id,
            ActivityKind::Transport,
            Measurement::Transport {
                from: submission.from_name.clone(),
                to: submission.to_name.clone(),
                distance_km,
                fare,
            },
            points,
            now,
        );
        if let Some(id) = activity_id {
            record = record.with_id(id);
        }

        if distance_km <= 0.0 {
            self.reject_and_store(&mut record, "route has no distance", now)
                .await?;
            return Ok((record, None));
        }

        self.verify_and_credit(&mut record, now).await?;
        let ticket = ticket_for(&record);
        Ok((record, ticket))
    }

    // ─── Plastic ─────────────────────────────────────────────────

    /// Redeem a bottle code. Malformed codes are a bad request; codes used
    /// before are a conflict.
    pub async fn redeem_bottle(
        &self,
        account_id: &str,
        raw_code: &str,
        now: DateTime<Utc>,
    ) -> Result<ActivityRecord> {
        let code = plastic::normalize_code(raw_code)?;

        let mut record = ActivityRecord::new(
            account_id,
            ActivityKind::Plastic,
            Measurement::Plastic { code: code.clone() },
            BOTTLE_POINTS,
            now,
        );
        record
            .verify(now)
            .map_err(|e| AppError::Internal(e.into()))?;

        let registry_entry = RedemptionCode {
            code,
            redeemed_by: account_id.to_string(),
            activity_id: record.activity_id.clone(),
            redeemed_at: now,
        };
        self.db.redeem_code(&registry_entry, &record).await?;

        tracing::info!(
            account_id,
            activity_id = %record.activity_id,
            "Bottle code redeemed"
        );
        Ok(record)
    }

    // ─── Ledger ──────────────────────────────────────────────────

    /// Current balance, after maturing any trees that are due.
    pub async fn balance(&self, account_id: &str, now: DateTime<Utc>) -> Result<PointBalance> {
        self.mature_due_trees(account_id, now).await?;
        Ok(self.db.get_balance(account_id).await?.unwrap_or_default())
    }

    async fn verify_and_credit(
        &self,
        record: &mut ActivityRecord,
        now: DateTime<Utc>,
    ) -> Result<CreditOutcome> {
        record
            .verify(now)
            .map_err(|e| AppError::Conflict(e.to_string()))?;

        let outcome = self.db.credit_activity(record).await?;
        match outcome {
            CreditOutcome::Credited => tracing::info!(
                account_id = %record.account_id,
                activity_id = %record.activity_id,
                kind = record.kind.as_str(),
                points = record.points,
                "Activity verified and credited"
            ),
            CreditOutcome::AlreadyCredited => tracing::debug!(
                activity_id = %record.activity_id,
                "Activity already credited (idempotent skip)"
            ),
        }
        Ok(outcome)
    }

    async fn reject_and_store(
        &self,
        record: &mut ActivityRecord,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        record
            .reject(reason, now)
            .map_err(|e| AppError::Conflict(e.to_string()))?;
        match self.db.insert_activity(record).await {
            Err(AppError::Conflict(msg)) => self.take_stored(record, msg).await,
            other => other,
        }
    }

    async fn plant_or_replay(
        &self,
        record: &mut ActivityRecord,
        site: &TreeSite,
    ) -> Result<bool> {
        match self.db.plant_tree(record, site).await {
            Err(AppError::Conflict(msg)) => self.take_stored(record, msg).await.map(|_| true),
            other => other,
        }
    }

    /// A concurrent retry stored the record first; continue with its copy.
    async fn take_stored(&self, record: &mut ActivityRecord, conflict: String) -> Result<()> {
        match self
            .db
            .get_activity(&record.activity_id)
            .await?
            .filter(|stored| stored.account_id == record.account_id)
        {
            Some(stored) => {
                *record = stored;
                Ok(())
            }
            None => Err(AppError::Conflict(conflict)),
        }
    }

    /// The stored record for a repeated submission, if any.
    async fn replay(
        &self,
        account_id: &str,
        activity_id: &str,
    ) -> Result<Option<ActivityRecord>> {
        let stored = self
            .db
            .get_activity(activity_id)
            .await?
            .filter(|r| r.account_id == account_id);
        if let Some(record) = &stored {
            tracing::info!(
                account_id,
                activity_id,
                status = record.status.as_str(),
                "Repeated submission, returning stored record"
            );
        }
        Ok(stored)
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Mirrors the Firestore collections with `DashMap`s. Writes that touch the
//! ledger (balances, bottle codes, verified records, reward claims) are
//! serialized through a single async mutex, which plays the role of a
//! Firestore transaction.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::db::{ActivityFilter, CreditOutcome};
use crate::error::AppError;
use crate::models::user::normalize_email;
use crate::models::{
    Account, ActivityRecord, PointBalance, RedemptionCode, Reward, RewardClaim, TreeSite,
    VerificationStatus,
};

/// In-memory database. Cloning shares the underlying collections.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Collections>,
}

#[derive(Default)]
struct Collections {
    /// Keyed by normalized email
    accounts: DashMap<String, Account>,
    activities: DashMap<String, ActivityRecord>,
    balances: DashMap<String, PointBalance>,
    redemption_codes: DashMap<String, RedemptionCode>,
    reward_claims: DashMap<String, RewardClaim>,
    tree_sites: DashMap<String, TreeSite>,
    ledger_lock: Mutex<()>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Accounts ────────────────────────────────────────────────

    pub fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        match self.inner.accounts.entry(normalize_email(&account.email)) {
            Entry::Occupied(_) => Err(AppError::UserExists),
            Entry::Vacant(slot) => {
                slot.insert(account.clone());
                Ok(())
            }
        }
    }

    pub fn get_account_by_email(&self, email: &str) -> Option<Account> {
        self.inner
            .accounts
            .get(&normalize_email(email))
            .map(|a| a.clone())
    }

    pub fn get_account(&self, account_id: &str) -> Option<Account> {
        self.inner
            .accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .map(|a| a.value().clone())
    }

    // ─── Activities ──────────────────────────────────────────────

    pub async fn insert_activity(&self, record: &ActivityRecord) -> Result<(), AppError> {
        // Take the ledger lock so a concurrent credit of the same ID is not overwritten.
        let _guard = self.inner.ledger_lock.lock().await;
        match self.inner.activities.entry(record.activity_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Activity {} already exists",
                record.activity_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    pub async fn plant_tree(
        &self,
        record: &ActivityRecord,
        site: &TreeSite,
    ) -> Result<bool, AppError> {
        let _guard = self.inner.ledger_lock.lock().await;
        if self.inner.tree_sites.contains_key(&site.site_id) {
            return Ok(false);
        }
        if self.inner.activities.contains_key(&record.activity_id) {
            return Err(AppError::Conflict(format!(
                "Activity {} already exists",
                record.activity_id
            )));
        }
        self.inner
            .tree_sites
            .insert(site.site_id.clone(), site.clone());
        self.inner
            .activities
            .insert(record.activity_id.clone(), record.clone());
        Ok(true)
    }

    pub fn get_activity(&self, activity_id: &str) -> Option<ActivityRecord> {
        self.inner.activities.get(activity_id).map(|r| r.clone())
    }

    pub fn list_activities(
        &self,
        account_id: &str,
        filter: ActivityFilter,
        limit: u32,
    ) -> Vec<ActivityRecord> {
        let mut records: Vec<ActivityRecord> = self
            .inner
            .activities
            .iter()
            .filter(|r| r.account_id == account_id && filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        records
    }

    // ─── Ledger ──────────────────────────────────────────────────

    pub fn get_balance(&self, account_id: &str) -> Option<PointBalance> {
        self.inner.balances.get(account_id).map(|b| b.clone())
    }

    pub async fn credit_activity(
        &self,
        record: &ActivityRecord,
        code: Option<&RedemptionCode>,
    ) -> Result<CreditOutcome, AppError> {
        let _guard = self.inner.ledger_lock.lock().await;

        if let Some(code) = code {
            if self.inner.redemption_codes.contains_key(&code.code) {
                return Err(AppError::Conflict(format!(
                    "Code {} has already been redeemed",
                    code.code
                )));
            }
        }

        let already_resolved = self
            .inner
            .activities
            .get(&record.activity_id)
            .is_some_and(|stored| !stored.is_pending());

        let mut balance = self.get_balance(&record.account_id).unwrap_or_default();

        if already_resolved || balance.recently_credited(&record.activity_id) {
            tracing::debug!(
                account_id = %record.account_id,
                activity_id = %record.activity_id,
                "Activity already credited (idempotent skip)"
            );
            return Ok(CreditOutcome::AlreadyCredited);
        }

        balance.credit(record, &chrono::Utc::now().to_rfc3339());

        if let Some(code) = code {
            self.inner
                .redemption_codes
                .insert(code.code.clone(), code.clone());
        }
        self.inner
            .activities
            .insert(record.activity_id.clone(), record.clone());
        self.inner
            .balances
            .insert(record.account_id.clone(), balance);

        Ok(CreditOutcome::Credited)
    }

    // ─── Aggregates ──────────────────────────────────────────────

    pub fn count_accounts(&self) -> u64 {
        self.inner.accounts.len() as u64
    }

    pub fn list_balances(&self) -> Vec<PointBalance> {
        self.inner
            .balances
            .iter()
            .map(|b| b.value().clone())
            .collect()
    }

    pub fn recent_rejections(&self, limit: u32) -> Vec<ActivityRecord> {
        let mut records: Vec<ActivityRecord> = self
            .inner
            .activities
            .iter()
            .filter(|r| r.status == VerificationStatus::Rejected)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        records
    }

    // ─── Rewards ─────────────────────────────────────────────────

    pub async fn claim_reward(
        &self,
        reward: &Reward,
        claim: &RewardClaim,
    ) -> Result<PointBalance, AppError> {
        let _guard = self.inner.ledger_lock.lock().await;

        let mut balance = self.get_balance(&claim.account_id).unwrap_or_default();
        balance
            .debit(reward.points, &chrono::Utc::now().to_rfc3339())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        self.inner
            .reward_claims
            .insert(claim.claim_id.clone(), claim.clone());
        self.inner
            .balances
            .insert(claim.account_id.clone(), balance.clone());

        Ok(balance)
    }

    pub fn list_reward_claims(&self, account_id: &str) -> Vec<RewardClaim> {
        let mut claims: Vec<RewardClaim> = self
            .inner
            .reward_claims
            .iter()
            .filter(|c| c.account_id == account_id)
            .map(|c| c.value().clone())
            .collect();
        claims.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));
        claims
    }
}

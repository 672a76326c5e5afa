//! Database layer.
//!
//! `Database` dispatches to Firestore in production or to the in-process
//! memory store for local development and tests. Both backends provide the
//! same ledger guarantees: an activity record is credited at most once and
//! balance updates are written together with the record they come from.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::models::{
    Account, ActivityKind, ActivityRecord, PointBalance, RedemptionCode, Reward, RewardClaim,
    TreeSite, VerificationStatus,
};

/// Collection names as constants.
pub mod collections {
    /// Accounts, keyed by normalized email
    pub const ACCOUNTS: &str = "accounts";
    pub const ACTIVITIES: &str = "activities";
    /// Point balance aggregates (keyed by account_id)
    pub const BALANCES: &str = "balances";
    /// One-time bottle codes (keyed by code)
    pub const REDEMPTION_CODES: &str = "redemption_codes";
    pub const REWARD_CLAIMS: &str = "reward_claims";
    /// Tree location cells (keyed by site_id)
    pub const TREE_SITES: &str = "tree_sites";
}

/// Optional filters for listing activity records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityFilter {
    pub kind: Option<ActivityKind>,
    pub status: Option<VerificationStatus>,
}

impl ActivityFilter {
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        self.kind.map_or(true, |k| record.kind == k)
            && self.status.map_or(true, |s| record.status == s)
    }
}

/// Outcome of crediting an activity record to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// The record was stored and its points added to the balance.
    Credited,
    /// The record had already been resolved; nothing was written.
    AlreadyCredited,
}

/// Application database handle.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl Database {
    /// Connect to the backend selected in the configuration.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.store {
            StoreBackend::Firestore => Ok(Self::Firestore(
                FirestoreDb::new(&config.gcp_project_id).await?,
            )),
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data will not survive a restart");
                Ok(Self::Memory(MemoryDb::new()))
            }
        }
    }

    /// Create an empty in-memory database.
    pub fn in_memory() -> Self {
        Self::Memory(MemoryDb::new())
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Create an account. Fails with `UserExists` if the email is taken.
    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.insert_account(account).await,
            Self::Memory(db) => db.insert_account(account),
        }
    }

    /// Look up an account by (normalized) email.
    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        match self {
            Self::Firestore(db) => db.get_account_by_email(email).await,
            Self::Memory(db) => Ok(db.get_account_by_email(email)),
        }
    }

    /// Look up an account by its ID.
    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>, AppError> {
        match self {
            Self::Firestore(db) => db.get_account(account_id).await,
            Self::Memory(db) => Ok(db.get_account(account_id)),
        }
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Store a record that does not touch the ledger (pending or rejected).
    pub async fn insert_activity(&self, record: &ActivityRecord) -> Result<(), AppError> {
        if record.status == VerificationStatus::Verified {
            return Err(AppError::Internal(anyhow::anyhow!(
                "verified records must go through credit_activity"
            )));
        }
        match self {
            Self::Firestore(db) => db.insert_activity(record).await,
            Self::Memory(db) => db.insert_activity(record).await,
        }
    }

    /// Store a pending tree together with its site claim.
    ///
    /// Returns `false` without writing anything if the site is already held.
    pub async fn plant_tree(
        &self,
        record: &ActivityRecord,
        site: &TreeSite,
    ) -> Result<bool, AppError> {
        if !record.is_pending() || record.kind != ActivityKind::Tree {
            return Err(AppError::Internal(anyhow::anyhow!(
                "only pending tree records hold a site (activity {})",
                record.activity_id
            )));
        }
        match self {
            Self::Firestore(db) => db.plant_tree(record, site).await,
            Self::Memory(db) => db.plant_tree(record, site).await,
        }
    }

    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<ActivityRecord>, AppError> {
        match self {
            Self::Firestore(db) => db.get_activity(activity_id).await,
            Self::Memory(db) => Ok(db.get_activity(activity_id)),
        }
    }

    /// List an account's records, newest first.
    pub async fn list_activities(
        &self,
        account_id: &str,
        filter: ActivityFilter,
        limit: u32,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        match self {
            Self::Firestore(db) => db.list_activities(account_id, filter, limit).await,
            Self::Memory(db) => Ok(db.list_activities(account_id, filter, limit)),
        }
    }

    // ─── Ledger Operations ───────────────────────────────────────

    pub async fn get_balance(&self, account_id: &str) -> Result<Option<PointBalance>, AppError> {
        match self {
            Self::Firestore(db) => db.get_balance(account_id).await,
            Self::Memory(db) => Ok(db.get_balance(account_id)),
        }
    }

    /// Atomically store a verified record and credit its points.
    ///
    /// Idempotent on `activity_id`: if the stored record is already resolved
    /// or the balance already lists the ID, nothing is written.
    pub async fn credit_activity(&self, record: &ActivityRecord) -> Result<CreditOutcome, AppError> {
        if record.status != VerificationStatus::Verified {
            return Err(AppError::Internal(anyhow::anyhow!(
                "only verified records can be credited (activity {} is {})",
                record.activity_id,
                record.status.as_str()
            )));
        }
        match self {
            Self::Firestore(db) => db.credit_activity(record, None).await,
            Self::Memory(db) => db.credit_activity(record, None).await,
        }
    }

    /// Atomically claim a one-time bottle code, store its verified record,
    /// and credit the points. Fails with `Conflict` if the code was used.
    pub async fn redeem_code(
        &self,
        code: &RedemptionCode,
        record: &ActivityRecord,
    ) -> Result<CreditOutcome, AppError> {
        match self {
            Self::Firestore(db) => db.credit_activity(record, Some(code)).await,
            Self::Memory(db) => db.credit_activity(record, Some(code)).await,
        }
    }

    // ─── Platform Aggregates ─────────────────────────────────────

    /// Number of registered accounts.
    pub async fn count_accounts(&self) -> Result<u64, AppError> {
        match self {
            Self::Firestore(db) => db.count_accounts().await,
            Self::Memory(db) => Ok(db.count_accounts()),
        }
    }

    /// Every account's balance aggregate.
    pub async fn list_balances(&self) -> Result<Vec<PointBalance>, AppError> {
        match self {
            Self::Firestore(db) => db.list_balances().await,
            Self::Memory(db) => Ok(db.list_balances()),
        }
    }

    /// Most recently rejected records across all accounts, newest first.
    pub async fn recent_rejections(&self, limit: u32) -> Result<Vec<ActivityRecord>, AppError> {
        match self {
            Self::Firestore(db) => db.recent_rejections(limit).await,
            Self::Memory(db) => Ok(db.recent_rejections(limit)),
        }
    }

    // ─── Reward Operations ───────────────────────────────────────

    /// Atomically debit the balance and store the claim.
    /// Returns the updated balance.
    pub async fn claim_reward(
        &self,
        reward: &Reward,
        claim: &RewardClaim,
    ) -> Result<PointBalance, AppError> {
        match self {
            Self::Firestore(db) => db.claim_reward(reward, claim).await,
            Self::Memory(db) => db.claim_reward(reward, claim).await,
        }
    }

    /// List an account's reward claims, newest first.
    pub async fn list_reward_claims(&self, account_id: &str) -> Result<Vec<RewardClaim>, AppError> {
        match self {
            Self::Firestore(db) => db.list_reward_claims(account_id).await,
            Self::Memory(db) => Ok(db.list_reward_claims(account_id)),
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Accounts (registration and login lookups)
//! - Activities (verification records)
//! - Balances (point ledger aggregates)
//! - Redemption codes and reward claims

use crate::db::{collections, ActivityFilter, CreditOutcome};
use crate::error::AppError;
use crate::models::user::normalize_email;
use crate::models::{
    Account, ActivityRecord, PointBalance, RedemptionCode, Reward, RewardClaim, TreeSite,
    VerificationStatus,
};
use firestore::errors::FirestoreError;
use firestore::FirestoreConsistencySelector;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// A client whose reads run inside `transaction`.
    fn in_transaction(
        &self,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        self.client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Create an account keyed by its normalized email.
    ///
    /// Firestore rejects the create if the document exists, which makes
    /// email uniqueness atomic.
    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        let result: Result<Account, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::ACCOUNTS)
            .document_id(normalize_email(&account.email))
            .object(account)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(AppError::UserExists),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Get an account by email.
    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNTS)
            .obj()
            .one(&normalize_email(email))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an account by account ID.
    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>, AppError> {
        let account_id = account_id.to_string();
        let accounts: Vec<Account> = self
            .client
            .fluent()
            .select()
            .from(collections::ACCOUNTS)
            .filter(move |q| q.field("account_id").eq(account_id.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(accounts.into_iter().next())
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Store a pending or rejected activity record.
    pub async fn insert_activity(&self, record: &ActivityRecord) -> Result<(), AppError> {
        let result: Result<ActivityRecord, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::ACTIVITIES)
            .document_id(&record.activity_id)
            .object(record)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(AppError::Conflict(format!(
                "Activity {} already exists",
                record.activity_id
            ))),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Store a pending tree and claim its site in one transaction.
    ///
    /// The site read is registered with the transaction, so of two uploads
    /// racing for the same cell only one commits.
    pub async fn plant_tree(
        &self,
        record: &ActivityRecord,
        site: &TreeSite,
    ) -> Result<bool, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let tx_client = self.in_transaction(&transaction);
        let held: Option<TreeSite> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::TREE_SITES)
            .obj()
            .one(&site.site_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let stored: Option<ActivityRecord> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&record.activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if held.is_some() {
            let _ = transaction.rollback().await;
            return Ok(false);
        }
        if stored.is_some() {
            let _ = transaction.rollback().await;
            return Err(AppError::Conflict(format!(
                "Activity {} already exists",
                record.activity_id
            )));
        }

        self.client
            .fluent()
            .update()
            .in_col(collections::TREE_SITES)
            .document_id(&site.site_id)
            .object(site)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add site to transaction: {}", e)))?;

        self.client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&record.activity_id)
            .object(record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add activity to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(true)
    }

    /// Get an activity record by ID.
    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<ActivityRecord>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an account's activity records, newest first.
    pub async fn list_activities(
        &self,
        account_id: &str,
        filter: ActivityFilter,
        limit: u32,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        let account_id = account_id.to_string();
        let kind = filter.kind.map(|k| k.as_str());
        let status = filter.status.map(|s| s.as_str());

        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("account_id").eq(account_id.clone()),
                    kind.and_then(|k| q.field("kind").eq(k)),
                    status.and_then(|s| q.field("status").eq(s)),
                ])
            })
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Ledger Operations ───────────────────────────────────────

    /// Get the point balance aggregate for an account.
    pub async fn get_balance(&self, account_id: &str) -> Result<Option<PointBalance>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::BALANCES)
            .obj()
            .one(account_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically store a verified record, update the balance, and
    /// (for bottles) claim the redemption code.
    ///
    /// Uses a Firestore transaction so that all writes succeed or fail
    /// together. Returns `AlreadyCredited` if the record was resolved before.
    pub async fn credit_activity(
        &self,
        record: &ActivityRecord,
        code: Option<&RedemptionCode>,
    ) -> Result<CreditOutcome, AppError> {
        let account_id = record.account_id.as_str();
        let activity_id = record.activity_id.as_str();

        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Reads through this client are registered for conflict detection
        let tx_client = self.in_transaction(&transaction);

        // 1. One-time codes: refuse if the code document already exists
        if let Some(code) = code {
            let existing: Option<RedemptionCode> = tx_client
                .fluent()
                .select()
                .by_id_in(collections::REDEMPTION_CODES)
                .obj()
                .one(&code.code)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if existing.is_some() {
                let _ = transaction.rollback().await;
                return Err(AppError::Conflict(format!(
                    "Code {} has already been redeemed",
                    code.code
                )));
            }
        }

        // 2. Status transitions happen once: skip if the stored record is resolved
        let stored: Option<ActivityRecord> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let mut balance = read_balance(&tx_client, account_id).await?;

        if stored.is_some_and(|s| !s.is_pending())
            || balance.recently_credited(activity_id)
        {
            tracing::debug!(
                account_id,
                activity_id,
                "Activity already credited (idempotent skip)"
            );
            let _ = transaction.rollback().await;
            return Ok(CreditOutcome::AlreadyCredited);
        }

        // 3. Update balance in memory
        balance.credit(record, &chrono::Utc::now().to_rfc3339());

        // 4. Add writes to the transaction
        self.client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(activity_id)
            .object(record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add activity to transaction: {}", e))
            })?;

        self.client
            .fluent()
            .update()
            .in_col(collections::BALANCES)
            .document_id(account_id)
            .object(&balance)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add balance to transaction: {}", e))
            })?;

        if let Some(code) = code {
            self.client
                .fluent()
                .update()
                .in_col(collections::REDEMPTION_CODES)
                .document_id(&code.code)
                .object(code)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add code to transaction: {}", e))
                })?;
        }

        // 5. Commit atomically
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            account_id,
            activity_id,
            points = record.points,
            "Activity credited atomically"
        );

        Ok(CreditOutcome::Credited)
    }

    // ─── Platform Aggregates ─────────────────────────────────────

    /// Count registered accounts.
    pub async fn count_accounts(&self) -> Result<u64, AppError> {
        let accounts: Vec<Account> = self
            .client
            .fluent()
            .select()
            .from(collections::ACCOUNTS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(accounts.len() as u64)
    }

    /// Load every balance aggregate.
    pub async fn list_balances(&self) -> Result<Vec<PointBalance>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::BALANCES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recently rejected records across all accounts.
    pub async fn recent_rejections(&self, limit: u32) -> Result<Vec<ActivityRecord>, AppError> {
        let rejected = VerificationStatus::Rejected.as_str();
        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("status").eq(rejected))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Reward Operations ───────────────────────────────────────

    /// Debit the balance and store the claim in one transaction.
    pub async fn claim_reward(
        &self,
        reward: &Reward,
        claim: &RewardClaim,
    ) -> Result<PointBalance, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let tx_client = self.in_transaction(&transaction);
        let mut balance = read_balance(&tx_client, &claim.account_id).await?;

        if let Err(e) = balance.debit(reward.points, &chrono::Utc::now().to_rfc3339()) {
            let _ = transaction.rollback().await;
            return Err(AppError::BadRequest(e.to_string()));
        }

        self.client
            .fluent()
            .update()
            .in_col(collections::BALANCES)
            .document_id(&claim.account_id)
            .object(&balance)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add balance to transaction: {}", e))
            })?;

        self.client
            .fluent()
            .update()
            .in_col(collections::REWARD_CLAIMS)
            .document_id(&claim.claim_id)
            .object(claim)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add claim to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(balance)
    }

    /// Get an account's reward claims, newest first.
    pub async fn list_reward_claims(&self, account_id: &str) -> Result<Vec<RewardClaim>, AppError> {
        let account_id = account_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::REWARD_CLAIMS)
            .filter(move |q| q.field("account_id").eq(account_id.clone()))
            .order_by([("claimed_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

async fn read_balance(
    client: &firestore::FirestoreDb,
    account_id: &str,
) -> Result<PointBalance, AppError> {
    let balance: Option<PointBalance> = client
        .fluent()
        .select()
        .by_id_in(collections::BALANCES)
        .obj()
        .one(account_id)
        .await
        .map_err(|e| AppError::Database(format!("Failed to read balance in transaction: {}", e)))?;
    Ok(balance.unwrap_or_default())
}

//! Account model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered account stored in the `accounts` collection.
///
/// The document ID is the normalized email, which makes registration a
/// create-if-absent write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable account ID (UUID v4), used as the JWT subject
    pub account_id: String,
    /// Normalized (trimmed, lowercase) email address
    pub email: String,
    /// Display name
    pub name: String,
    /// bcrypt hash of the password
    pub password_hash: String,
    /// When the account was registered
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: &str, email: &str, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            account_id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash,
            created_at: now,
        }
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables through secret
//! bindings, so everything is read once at startup.

use std::env;

use crate::models::user::normalize_email;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Firestore (or the emulator when `FIRESTORE_EMULATOR_HOST` is set).
    Firestore,
    /// Process-local store, for local development and tests.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Document store backend
    pub store: StoreBackend,

    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Session token lifetime in hours
    pub jwt_ttl_hours: u64,

    /// OSRM-compatible routing service
    pub routing_base_url: String,
    /// Nominatim-compatible geocoding service
    pub geocoding_base_url: String,
    /// Remote image classifier; the local heuristic is used when unset
    pub classifier_url: Option<String>,

    /// Normalized emails of accounts allowed on the admin routes
    pub admin_emails: Vec<String>,
}

impl Config {
    /// Config for tests: in-memory store, fixed signing key.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store: StoreBackend::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            jwt_ttl_hours: 1,
            routing_base_url: "http://127.0.0.1:5000".to_string(),
            geocoding_base_url: "http://127.0.0.1:5001".to_string(),
            classifier_url: None,
            admin_emails: Vec::new(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store = match env::var("ECOTRACK_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(other) => return Err(ConfigError::Invalid("ECOTRACK_STORE", other.to_string())),
        };

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.len() < 32 {
            return Err(ConfigError::Invalid(
                "JWT_SIGNING_KEY",
                "must be at least 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store,
            jwt_signing_key,
            jwt_ttl_hours: env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            routing_base_url: env::var("ROUTING_BASE_URL")
                .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
            geocoding_base_url: env::var("GEOCODING_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            classifier_url: env::var("CLASSIFIER_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            admin_emails: env::var("ADMIN_EMAILS")
                .map(|v| parse_email_list(&v))
                .unwrap_or_default(),
        })
    }
}

/// Split a comma-separated email list, normalized for comparison.
fn parse_email_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global, so everything touching them lives in one test.
    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!!");
        env::set_var("ECOTRACK_STORE", "memory");
        env::remove_var("CLASSIFIER_URL");
        env::remove_var("ADMIN_EMAILS");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.jwt_ttl_hours, 1);
        assert!(config.classifier_url.is_none());
        assert!(config.admin_emails.is_empty());

        env::set_var("ECOTRACK_STORE", "sqlite");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("ECOTRACK_STORE", _))
        ));

        env::set_var("ECOTRACK_STORE", "memory");
        env::set_var("JWT_SIGNING_KEY", "short");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("JWT_SIGNING_KEY", _))
        ));
    }

    #[test]
    fn test_admin_email_list() {
        assert_eq!(
            parse_email_list(" Ops@EcoTrack.example , ,lead@ecotrack.example"),
            vec!["ops@ecotrack.example", "lead@ecotrack.example"]
        );
        assert!(parse_email_list("").is_empty());
    }
}

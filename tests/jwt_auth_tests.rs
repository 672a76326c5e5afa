// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests verify that JWT tokens created at login can be decoded
//! by the auth middleware, catching compatibility issues early.

use ecotrack::middleware::auth::{create_jwt, decode_jwt};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims structure that must match what the middleware expects.
/// This is the canonical format - if either create_jwt or the middleware
/// changes, this test should catch the incompatibility.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

#[test]
fn test_jwt_roundtrip() {
    let account_id = "0b9f3c1e-4a57-4a8e-9a3c-2f1d7e6b5a40";

    // Create token (like login does)
    let token = create_jwt(account_id, SIGNING_KEY, 1).unwrap();

    // Decode with an independent Claims definition
    let key = DecodingKey::from_secret(SIGNING_KEY);
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(&token, &key, &validation)
        .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(token_data.claims.sub, account_id);
    assert!(token_data.claims.exp > token_data.claims.iat);

    // And with the middleware's decoder
    assert_eq!(decode_jwt(&token, SIGNING_KEY).unwrap(), account_id);
}

#[test]
fn test_jwt_expiration_matches_ttl() {
    use std::time::{SystemTime, UNIX_EPOCH};

    let token = create_jwt("acct-1", SIGNING_KEY, 1).unwrap();

    let key = DecodingKey::from_secret(SIGNING_KEY);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false; // We'll check manually

    let token_data = decode::<Claims>(&token, &key, &validation).unwrap();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    // One hour, allowing for clock movement during the test
    assert!(token_data.claims.exp > now + 3500);
    assert!(token_data.claims.exp <= now + 3600);
}

#[test]
fn test_jwt_other_algorithm_rejected() {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: "acct-1".to_string(),
        exp: now + 3600,
        iat: now,
    };
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(decode_jwt(&token, SIGNING_KEY).is_err());
}

#[test]
fn test_jwt_empty_subject_rejected() {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: String::new(),
        exp: now + 3600,
        iat: now,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(decode_jwt(&token, SIGNING_KEY).is_err());
}

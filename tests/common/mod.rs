// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use ecotrack::config::Config;
use ecotrack::db::{Database, FirestoreDb};
use ecotrack::routes::create_router;
use ecotrack::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    Database::Firestore(
        FirestoreDb::new("test-project")
            .await
            .expect("Failed to connect to Firestore emulator"),
    )
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

/// Create a test app with a custom configuration.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Database::in_memory()));
    (create_router(state.clone()), state)
}

/// Generate a unique email for test isolation.
#[allow(dead_code)]
pub fn unique_email() -> String {
    format!("user-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Send a JSON request, optionally with a bearer token.
#[allow(dead_code)]
pub async fn send_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

/// Read a response body as JSON (`Value::Null` when empty).
#[allow(dead_code)]
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// Register an account and log in, returning the bearer token.
#[allow(dead_code)]
pub async fn register_and_login(app: &axum::Router, email: &str, password: &str) -> String {
    let (status, _) = send_json(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Test User", "email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Register a fresh account and return its bearer token.
#[allow(dead_code)]
pub async fn new_user_token(app: &axum::Router) -> String {
    register_and_login(app, &unique_email(), "secret123").await
}

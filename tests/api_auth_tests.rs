// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Registration and login follow the account rules
//! 2. Protected routes reject requests without valid tokens
//! 3. Protected routes accept requests with valid tokens
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, register_and_login, send_json, unique_email};

#[tokio::test]
async fn test_register_returns_created() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Asha", "email": unique_email(), "password": "secret123"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let (app, _) = create_test_app();
    let email = unique_email();
    let request = json!({"name": "Asha", "email": email, "password": "secret123"});

    let (status, _) = send_json(&app, "POST", "/api/auth/register", None, Some(request)).await;
    assert_eq!(status, StatusCode::CREATED);

    // Same email, different case
    let again = json!({"name": "Asha", "email": email.to_uppercase(), "password": "other456"});
    let (status, body) = send_json(&app, "POST", "/api/auth/register", None, Some(again)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_exists");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _) = create_test_app();
    let email = unique_email();
    register_and_login(&app, &email, "secret123").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": "wrong-password"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_credentials");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_login_unknown_user() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": unique_email(), "password": "secret123"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_login_returns_token_and_profile() {
    let (app, _) = create_test_app();
    let email = unique_email();
    let token = register_and_login(&app, &email, "secret123").await;

    let (status, body) = send_json(&app, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], email);
    assert_eq!(body["name"], "Test User");
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let (app, _) = create_test_app();
    let email = unique_email();
    register_and_login(&app, &email, "secret123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"email": email, "password": "secret123"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login should set a cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("ecotrack_token="));
    assert!(cookie.contains("HttpOnly"));

    // The cookie alone authenticates
    let pair = cookie.split(';').next().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/points")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/points")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _) = create_test_app();
    let token =
        ecotrack::middleware::auth::create_jwt("acct-1", b"a_completely_different_key_32b!!", 1)
            .unwrap();

    let (status, _) = send_json(&app, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/points")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/points")
                .header(header::ORIGIN, "https://evil.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

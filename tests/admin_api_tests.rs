// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin overview tests.

use axum::http::StatusCode;
use ecotrack::config::Config;
use serde_json::json;

mod common;
use common::{create_test_app_with, new_user_token, register_and_login, send_json};

const ADMIN_EMAIL: &str = "ops@ecotrack.example";

fn admin_app() -> axum::Router {
    let mut config = Config::test_default();
    config.admin_emails = vec![ADMIN_EMAIL.to_string()];
    create_test_app_with(config).0
}

#[tokio::test]
async fn test_overview_requires_admin() {
    let app = admin_app();

    let (status, _) = send_json(&app, "GET", "/api/admin/overview", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = new_user_token(&app).await;
    let (status, _) = send_json(&app, "GET", "/api/admin/overview", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_overview_totals_and_alerts() {
    let app = admin_app();
    let user = new_user_token(&app).await;

    for code in ["ADM001", "ADM002"] {
        send_json(
            &app,
            "POST",
            "/api/activities/plastic",
            Some(&user),
            Some(json!({ "code": code })),
        )
        .await;
    }
    // A gray photo is rejected and shows up as an alert
    let gray = {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        STANDARD.encode([120u8; 4 * 4 * 4])
    };
    send_json(
        &app,
        "POST",
        "/api/activities/tree",
        Some(&user),
        Some(json!({"lat": 12.9716, "lon": 77.5946, "width": 4, "height": 4, "image": gray})),
    )
    .await;

    // Emails are matched case-insensitively
    let admin = register_and_login(&app, "Ops@EcoTrack.example", "secret123").await;
    let (status, body) = send_json(&app, "GET", "/api/admin/overview", Some(&admin), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["bottles_recycled"], 2);
    assert_eq!(body["trees_planted"], 0);
    assert_eq!(body["points_earned"], 30);
    assert_eq!(body["points_spent"], 0);

    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["kind"], "tree");
    assert_eq!(alerts[0]["reason"], "no vegetation detected");
}

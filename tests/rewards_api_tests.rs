// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward catalog and claim tests.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_test_app, new_user_token, send_json};

/// Redeem `count` distinct bottle codes (15 points each).
async fn earn_bottles(app: &axum::Router, token: &str, prefix: &str, count: usize) {
    for i in 0..count {
        let code = format!("{}{:03}", prefix, i);
        let (status, _) = send_json(
            app,
            "POST",
            "/api/activities/plastic",
            Some(token),
            Some(json!({ "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "code {}", code);
    }
}

#[tokio::test]
async fn test_catalog_marks_affordable() {
    let (app, _) = create_test_app();
    let token = new_user_token(&app).await;
    // 14 bottles = 210 points
    earn_bottles(&app, &token, "AFF", 14).await;

    let (status, body) = send_json(&app, "GET", "/api/rewards", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_points"], 210);

    let rewards = body["rewards"].as_array().unwrap();
    assert_eq!(rewards.len(), 6);
    let find = |id: &str| rewards.iter().find(|r| r["id"] == id).unwrap().clone();

    assert_eq!(find("eco-products-20")["affordable"], true);
    assert_eq!(find("bus-day-pass")["affordable"], false);
    assert_eq!(find("gift-card-500")["available"], false);
}

#[tokio::test]
async fn test_claim_reward_debits_points() {
    let (app, _) = create_test_app();
    let token = new_user_token(&app).await;
    // 21 bottles = 315 points
    earn_bottles(&app, &token, "BUS", 21).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/rewards/bus-day-pass/claim",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["available_points"], 15);
    assert_eq!(body["claim"]["points_spent"], 300);
    assert!(body["claim"]["voucher_code"]
        .as_str()
        .unwrap()
        .starts_with("BDP"));

    let (_, points) = send_json(&app, "GET", "/api/points", Some(&token), None).await;
    assert_eq!(points["earned"], 315);
    assert_eq!(points["spent"], 300);
    assert_eq!(points["available"], 15);

    let (status, claims) =
        send_json(&app, "GET", "/api/rewards/claims", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claims["claims"].as_array().unwrap().len(), 1);

    // Not enough left for a second pass
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/rewards/bus-day-pass/claim",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_claim_unknown_or_unavailable_reward() {
    let (app, _) = create_test_app();
    let token = new_user_token(&app).await;

    let (status, _) =
        send_json(&app, "POST", "/api/rewards/yacht/claim", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/rewards/monthly-bus-pass/claim",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_claims_never_overspend() {
    let (app, _) = create_test_app();
    let token = new_user_token(&app).await;
    // 14 bottles = 210 points: one eco-products claim (200) fits, two do not
    earn_bottles(&app, &token, "CON", 14).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let app = app.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            send_json(
                &app,
                "POST",
                "/api/rewards/eco-products-20/claim",
                Some(&token),
                None,
            )
            .await
            .0
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() == StatusCode::CREATED {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let (_, points) = send_json(&app, "GET", "/api/points", Some(&token), None).await;
    assert_eq!(points["available"], 10);
}

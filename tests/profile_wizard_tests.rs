// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile persistence and questionnaire wizard tests.

use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{create_test_app, json_body, register, send};

#[tokio::test]
async fn test_new_account_has_default_profile() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(&app.router, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["sex"], "");
    assert_eq!(body["age"], 0);
    assert_eq!(body["force"]["pushUps"], 0);
    assert_eq!(body["objectives"]["weightLoss"], false);
}

#[tokio::test]
async fn test_profile_put_then_get() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(
        &app.router,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({
            "sex": "homme",
            "age": 34,
            "weight": 80.0,
            "objectives": {"muscleGain": true}
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert!(saved["updatedAt"].is_string());
    assert_eq!(app.backend.profile_writes(), 1);

    // Drop the memoized copy so the read below reaches the stored row
    let account_id = saved_account(&app, &token).await;
    app.state.profiles.forget(account_id).await;

    let response = send(&app.router, "GET", "/api/profile", Some(&token), None).await;
    let body = json_body(response).await;
    assert_eq!(body["sex"], "homme");
    assert_eq!(body["age"], 34);
    assert_eq!(body["weight"], 80.0);
    assert_eq!(body["height"], 0.0);
    assert_eq!(body["objectives"]["muscleGain"], true);
    assert_eq!(body["objectives"]["endurance"], false);
}

#[tokio::test]
async fn test_profile_accepts_french_weight_field() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(
        &app.router,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"sex": "homme", "age": 34, "poids": 80})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["weight"], 80.0);

    let account_id = saved_account(&app, &token).await;
    app.state.profiles.forget(account_id).await;

    let body = json_body(send(&app.router, "GET", "/api/profile", Some(&token), None).await).await;
    assert_eq!(body["sex"], "homme");
    assert_eq!(body["age"], 34);
    assert_eq!(body["weight"], 80.0);
}

async fn saved_account(app: &common::TestApp, token: &str) -> uuid::Uuid {
    let body = json_body(send(&app.router, "GET", "/api/me", Some(token), None).await).await;
    body["accountId"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_profile_put_rejects_malformed_body() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(
        &app.router,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"age": "trente"})),
    )
    .await;

    assert!(response.status().is_client_error());
    assert_eq!(app.backend.profile_writes(), 0);
}

#[tokio::test]
async fn test_wizard_full_flow() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(&app.router, "GET", "/api/wizard", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await;
    assert_eq!(view["stepNumber"], 1);
    assert_eq!(view["isFirst"], true);
    assert_eq!(view["totalSteps"], 5);

    let steps = [
        json!({
            "step": "identity",
            "data": {"sex": "femme", "age": 29, "weight": 58.5, "height": 165.0}
        }),
        json!({
            "step": "strengthFlexibility",
            "data": {"force": {"pushUps": 15, "squats": 30, "plankSeconds": 60}}
        }),
        json!({"step": "metabolicCardio", "data": {"cardio": {"vo2Max": 41.0}}}),
        json!({"step": "objectives", "data": {"endurance": true, "flexibility": true}}),
        json!({
            "step": "restrictionsHealth",
            "data": {"dietaryRestrictions": {"vegetarian": true}}
        }),
    ];

    for (i, step) in steps.iter().enumerate() {
        let response = send(
            &app.router,
            "PUT",
            "/api/wizard/step",
            Some(&token),
            Some(step.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK, "step {}", i + 1);

        if i + 1 < steps.len() {
            let response = send(&app.router, "POST", "/api/wizard/next", Some(&token), None).await;
            assert_eq!(json_body(response).await["stepNumber"], i as u64 + 2);
        }
    }

    // Nothing has been written before the last step is submitted
    assert_eq!(app.backend.profile_writes(), 0);

    let response = send(&app.router, "POST", "/api/wizard/finish", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["redirectTo"], "/dashboard");
    assert_eq!(body["profile"]["age"], 29);
    assert_eq!(body["profile"]["force"]["pushUps"], 15);
    assert_eq!(body["profile"]["dietaryRestrictions"]["vegetarian"], true);
    assert_eq!(app.backend.profile_writes(), 1);

    // A new wizard starts from the saved profile
    let response = send(&app.router, "GET", "/api/wizard", Some(&token), None).await;
    let view = json_body(response).await;
    assert_eq!(view["stepNumber"], 1);
    assert_eq!(view["draft"]["sex"], "femme");
}

#[tokio::test]
async fn test_wizard_finish_before_last_step_rejected() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(&app.router, "POST", "/api/wizard/finish", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.backend.profile_writes(), 0);
}

#[tokio::test]
async fn test_wizard_navigation_clamps() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(&app.router, "POST", "/api/wizard/previous", Some(&token), None).await;
    assert_eq!(json_body(response).await["stepNumber"], 1);

    for _ in 0..7 {
        send(&app.router, "POST", "/api/wizard/next", Some(&token), None).await;
    }
    let response = send(&app.router, "GET", "/api/wizard", Some(&token), None).await;
    let view = json_body(response).await;
    assert_eq!(view["stepNumber"], 5);
    assert_eq!(view["isLast"], true);
}

#[tokio::test]
async fn test_wizard_step_mismatch_rejected() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(
        &app.router,
        "PUT",
        "/api/wizard/step",
        Some(&token),
        Some(json!({"step": "objectives", "data": {"weightLoss": true}})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wizard_reset_discards_draft() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    send(
        &app.router,
        "PUT",
        "/api/wizard/step",
        Some(&token),
        Some(json!({
            "step": "identity",
            "data": {"sex": "homme", "age": 50, "weight": 90.0, "height": 175.0}
        })),
    )
    .await;
    send(&app.router, "POST", "/api/wizard/next", Some(&token), None).await;

    let response = send(&app.router, "DELETE", "/api/wizard", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let view = json_body(send(&app.router, "GET", "/api/wizard", Some(&token), None).await).await;
    assert_eq!(view["stepNumber"], 1);
    assert_eq!(view["draft"]["age"], 0);
}

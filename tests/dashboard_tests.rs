// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard panel tests through the HTTP API.

use axum::http::StatusCode;
use fitcoach::config::Config;
use serde_json::{json, Value};
use std::time::Duration;

mod common;

use common::{create_test_app, create_test_app_with, json_body, register, send, StubBehavior};

fn filled_profile() -> Value {
    json!({"sex": "femme", "age": 41, "weight": 64.0, "height": 170.0})
}

/// Poll a panel until it settles.
async fn wait_for_panel(app: &common::TestApp, token: &str, kind: &str) -> Value {
    for _ in 0..200 {
        let uri = format!("/api/dashboard/{}", kind);
        let panel = json_body(send(&app.router, "GET", &uri, Some(token), None).await).await;
        if panel["state"] == "ready" || panel["state"] == "failed" {
            return panel;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("panel {} never settled", kind);
}

#[tokio::test]
async fn test_blank_profile_does_not_autostart() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(&app.router, "GET", "/api/dashboard", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["profileComplete"], false);
    let panels = body["panels"].as_array().unwrap();
    assert_eq!(panels.len(), 3);
    assert!(panels.iter().all(|p| p["state"] == "idle"));
    assert_eq!(app.llm.calls(), 0);
}

#[tokio::test]
async fn test_filled_profile_autostarts_all_panels() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;
    send(&app.router, "PUT", "/api/profile", Some(&token), Some(filled_profile())).await;

    let response = send(&app.router, "GET", "/api/dashboard", Some(&token), None).await;
    let body = json_body(response).await;
    assert_eq!(body["profileComplete"], true);
    for panel in body["panels"].as_array().unwrap() {
        assert!(panel["state"] == "loading" || panel["state"] == "ready");
    }

    let nutrition = wait_for_panel(&app, &token, "nutrition").await;
    assert_eq!(nutrition["state"], "ready");
    assert_eq!(nutrition["kind"], "nutrition");
    assert_eq!(nutrition["content"]["dailyCalories"], 2400);

    let supplements = wait_for_panel(&app, &token, "supplements").await;
    assert_eq!(supplements["content"]["supplements"][0]["name"], "Magnésium");

    let flexibility = wait_for_panel(&app, &token, "flexibility").await;
    assert_eq!(flexibility["content"]["sessionsPerWeek"], 5);

    assert_eq!(app.llm.calls(), 3);

    // Settled panels are not started again
    send(&app.router, "GET", "/api/dashboard", Some(&token), None).await;
    assert_eq!(app.llm.calls(), 3);
}

#[tokio::test]
async fn test_generate_on_demand() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(
        &app.router,
        "POST",
        "/api/dashboard/nutrition/generate",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let panel = json_body(response).await;
    assert_eq!(panel["state"], "ready");
    assert_eq!(panel["fromCache"], false);
    assert!(panel["error"].is_null());
    // Fields the stub left out fall back to the default plan
    assert_eq!(panel["content"]["dailyCalories"], 2400);
    assert_eq!(panel["content"]["macros"]["proteinGrams"], 120);
}

#[tokio::test]
async fn test_supplements_cached_until_profile_changes() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;
    send(&app.router, "PUT", "/api/profile", Some(&token), Some(filled_profile())).await;

    let uri = "/api/dashboard/supplements/generate";
    let first = json_body(send(&app.router, "POST", uri, Some(&token), None).await).await;
    assert_eq!(first["fromCache"], false);

    let second = json_body(send(&app.router, "POST", uri, Some(&token), None).await).await;
    assert_eq!(second["fromCache"], true);
    assert_eq!(app.llm.calls(), 1);

    let forced = json_body(
        send(&app.router, "POST", &format!("{}?force=true", uri), Some(&token), None).await,
    )
    .await;
    assert_eq!(forced["fromCache"], false);
    assert_eq!(app.llm.calls(), 2);

    let mut changed = filled_profile();
    changed["age"] = json!(42);
    send(&app.router, "PUT", "/api/profile", Some(&token), Some(changed)).await;

    let after = json_body(send(&app.router, "POST", uri, Some(&token), None).await).await;
    assert_eq!(after["fromCache"], false);
    assert_eq!(app.llm.calls(), 3);
}

#[tokio::test]
async fn test_failed_generation_allows_retry() {
    let app = create_test_app_with(Config::test_default(), StubBehavior::Fail);
    let token = register(&app.router, "camille@example.com").await;

    let uri = "/api/dashboard/flexibility/generate";
    let panel = json_body(send(&app.router, "POST", uri, Some(&token), None).await).await;
    assert_eq!(panel["state"], "failed");
    assert!(panel["error"].is_string());
    assert!(panel["content"].is_null());

    send(&app.router, "POST", uri, Some(&token), None).await;
    assert_eq!(app.llm.calls(), 2);
}

#[tokio::test]
async fn test_generation_deadline_marks_panel_failed() {
    let mut config = Config::test_default();
    config.generation_timeout = Duration::from_millis(50);
    let app = create_test_app_with(config, StubBehavior::Hang);
    let token = register(&app.router, "camille@example.com").await;

    let panel = json_body(
        send(
            &app.router,
            "POST",
            "/api/dashboard/nutrition/generate",
            Some(&token),
            None,
        )
        .await,
    )
    .await;

    assert_eq!(panel["state"], "failed");
    assert!(panel["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_unknown_kind_rejected() {
    let app = create_test_app();
    let token = register(&app.router, "camille@example.com").await;

    let response = send(&app.router, "GET", "/api/dashboard/cardio", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dashboard_requires_auth() {
    let app = create_test_app();
    let response = send(&app.router, "GET", "/api/dashboard", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

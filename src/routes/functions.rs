// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generation proxy endpoints.
//!
//! These take the profile in the request body instead of reading it from the
//! session, so they are open to any origin and need no app JWT.

use crate::error::AppError;
use crate::models::{ContentKind, GeneratedContent, NutritionPlan, UserProfile};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ]);

    Router::new()
        .route("/functions/generate-content", post(generate_content))
        .route("/functions/generate-nutrition", post(generate_nutrition))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(default)]
    pub user_data: Option<Value>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateNutritionRequest {
    #[serde(default)]
    pub user_data: Option<Value>,
}

#[derive(Serialize)]
pub struct ContentResponse<T: Serialize> {
    pub content: T,
}

#[derive(Serialize)]
pub struct FunctionError {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(FunctionError {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Read `userData` leniently: missing or null is the default profile.
fn parse_user_data(value: Option<Value>) -> Result<UserProfile, String> {
    match value {
        None | Some(Value::Null) => Ok(UserProfile::default()),
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid userData: {}", e)),
    }
}

async fn generate_content(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateContentRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let Some(content_type) = body.content_type else {
        return error_response(StatusCode::BAD_REQUEST, "Missing contentType");
    };
    let kind: ContentKind = match content_type.parse() {
        Ok(kind) => kind,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let profile = match parse_user_data(body.user_data) {
        Ok(profile) => profile,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    match state.generation.generate(&profile, kind).await {
        Ok(content) => Json(ContentResponse::<GeneratedContent> { content }).into_response(),
        Err(e) => {
            tracing::warn!(content_type = %kind, error = %e, "Proxy generation failed");
            let status = match e {
                AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, e.to_string())
        }
    }
}

/// Always answers with a plan; failures fall back to the default one.
async fn generate_nutrition(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateNutritionRequest>, JsonRejection>,
) -> Response {
    let profile = match body {
        Ok(Json(body)) => parse_user_data(body.user_data).unwrap_or_else(|msg| {
            tracing::warn!(error = %msg, "Unreadable userData, using default profile");
            UserProfile::default()
        }),
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let plan = state.generation.generate_nutrition_or_default(&profile).await;
    Json(ContentResponse::<NutritionPlan> { content: plan }).into_response()
}

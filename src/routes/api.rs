// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/profile", get(get_profile).put(put_profile))
}

// ─── Account ─────────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub account_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Get current user.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let name = state.sessions.account_name(&user.ctx).await?;

    Ok(Json(UserResponse {
        account_id: user.account_id,
        email: state.sessions.email(user.account_id).await,
        name,
    }))
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.load_user_data(Some(&user.ctx)).await?))
}

/// Replace the whole profile (last write wins).
async fn put_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>> {
    let saved = state
        .profiles
        .save_user_data(Some(&user.ctx), Some(&profile))
        .await?;

    state.dashboard.profile_changed(user.account_id, &saved);
    state.wizards.discard(user.account_id).await;

    Ok(Json(saved))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Questionnaire wizard routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::wizard::{StepInput, WizardCompletion, WizardView};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wizard", get(current).delete(reset))
        .route("/api/wizard/step", put(save_step))
        .route("/api/wizard/next", post(next))
        .route("/api/wizard/previous", post(previous))
        .route("/api/wizard/finish", post(finish))
}

async fn current(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WizardView>> {
    Ok(Json(state.wizards.current(&user.ctx).await?))
}

async fn save_step(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<StepInput>,
) -> Result<Json<WizardView>> {
    let view = state
        .wizards
        .update(&user.ctx, move |wizard| wizard.apply(input))
        .await?;
    Ok(Json(view))
}

async fn next(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WizardView>> {
    let view = state
        .wizards
        .update(&user.ctx, |wizard| {
            wizard.next();
            Ok(())
        })
        .await?;
    Ok(Json(view))
}

async fn previous(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WizardView>> {
    let view = state
        .wizards
        .update(&user.ctx, |wizard| {
            wizard.previous();
            Ok(())
        })
        .await?;
    Ok(Json(view))
}

/// Save the questionnaire and point the client at the dashboard.
async fn finish(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WizardCompletion>> {
    let completion = state.wizards.finish(&user.ctx).await?;
    state
        .dashboard
        .profile_changed(user.account_id, &completion.profile);
    Ok(Json(completion))
}

/// Drop unsaved answers.
async fn reset(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> StatusCode {
    state.wizards.discard(user.account_id).await;
    StatusCode::NO_CONTENT
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard routes: panel state and on-demand generation.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::ContentKind;
use crate::services::{DashboardOverview, PanelView};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard", get(overview))
        .route("/api/dashboard/{kind}", get(panel))
        .route("/api/dashboard/{kind}/generate", post(generate))
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateParams {
    /// Regenerate even when a cached document is still valid.
    #[serde(default)]
    force: bool,
}

async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardOverview>> {
    Ok(Json(state.dashboard.overview(&user.ctx).await?))
}

async fn panel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
) -> Result<Json<PanelView>> {
    let kind: ContentKind = kind.parse()?;
    Ok(Json(state.dashboard.panel(user.account_id, kind)))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<PanelView>> {
    let kind: ContentKind = kind.parse()?;
    tracing::info!(
        account_id = %user.account_id,
        content_type = %kind,
        force = params.force,
        "Generation requested"
    );

    Ok(Json(
        state.dashboard.generate(&user.ctx, kind, params.force).await?,
    ))
}

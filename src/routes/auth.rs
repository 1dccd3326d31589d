// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{extract::State, http::HeaderMap, routing::get, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, decode_jwt, token_from_request, AUTH_COOKIE};
use crate::models::AccountContext;
use crate::services::SessionStatus;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/session", get(session))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Login/registration response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// App JWT, also set as a cookie. Absent while email confirmation is pending.
    pub token: Option<String>,
    pub confirmation_required: bool,
    pub status: SessionStatus,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

fn session_cookie(state: &AppState, jwt: String) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, jwt))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.frontend_url.starts_with("https://"))
        .path("/")
        .build()
}

fn issue_jwt(state: &AppState, account_id: Uuid) -> Result<String> {
    create_jwt(account_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

/// Session status for a live account, resolving the profile on the way.
///
/// The account only counts as authenticated once its profile has loaded.
async fn signed_in_status(state: &AppState, ctx: &AccountContext) -> SessionStatus {
    let profile_resolved = match state.profiles.load_user_data(Some(ctx)).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(
                account_id = %ctx.account_id,
                error = %e,
                "Profile load failed during session check"
            );
            false
        }
    };

    state.sessions.status(ctx, profile_resolved).await
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    body.validate()?;

    let session = state.sessions.login(&body.email, &body.password).await?;
    let ctx = AccountContext {
        account_id: session.user.id,
        access_token: session.access_token.clone(),
    };

    let jwt = issue_jwt(&state, ctx.account_id)?;
    let status = signed_in_status(&state, &ctx).await;

    Ok((
        jar.add(session_cookie(&state, jwt.clone())),
        Json(AuthResponse {
            token: Some(jwt),
            confirmation_required: false,
            status,
        }),
    ))
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    body.validate()?;

    let result = state
        .sessions
        .register(&body.email, &body.password, body.name.trim())
        .await?;

    let Some(session) = result.session else {
        return Ok((
            jar,
            Json(AuthResponse {
                token: None,
                confirmation_required: true,
                status: SessionStatus::anonymous(),
            }),
        ));
    };

    let ctx = AccountContext {
        account_id: session.user.id,
        access_token: session.access_token,
    };
    let jwt = issue_jwt(&state, ctx.account_id)?;
    let status = signed_in_status(&state, &ctx).await;

    Ok((
        jar.add(session_cookie(&state, jwt.clone())),
        Json(AuthResponse {
            token: Some(jwt),
            confirmation_required: false,
            status,
        }),
    ))
}

/// End the session. Always succeeds from the client's point of view.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Json<LogoutResponse>) {
    let account_id = token_from_request(&jar, &headers)
        .and_then(|token| decode_jwt(&token, &state.config.jwt_signing_key).ok());

    if let Some(account_id) = account_id {
        state.sessions.logout(account_id).await;
        state.profiles.forget(account_id).await;
        state.wizards.discard(account_id).await;
        state.dashboard.forget(account_id);
    }

    (
        jar.remove(Cookie::build((AUTH_COOKIE, "")).path("/")),
        Json(LogoutResponse { success: true }),
    )
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>> {
    let token = token_from_request(&jar, &headers).ok_or(AppError::Unauthorized)?;
    let account_id = decode_jwt(&token, &state.config.jwt_signing_key)?;

    let session = state.sessions.refresh_session(account_id).await?;
    let ctx = AccountContext {
        account_id,
        access_token: session.access_token,
    };

    Ok(Json(signed_in_status(&state, &ctx).await))
}

/// Answer "who is logged in", never leaving the client waiting on a guess.
async fn session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>> {
    let account_id = token_from_request(&jar, &headers)
        .and_then(|token| decode_jwt(&token, &state.config.jwt_signing_key).ok());

    let Some(account_id) = account_id else {
        return Ok(Json(SessionStatus::anonymous()));
    };

    match state.sessions.current(account_id).await {
        Ok(ctx) => Ok(Json(signed_in_status(&state, &ctx).await)),
        Err(e) if e.is_session_error() => Ok(Json(SessionStatus::anonymous())),
        Err(e) => Err(e),
    }
}

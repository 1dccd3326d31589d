// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.
//!
//! The app JWT only names the account. Whether the account is still signed in
//! is decided by the session store, which in turn defers to the backend.

use crate::error::AppError;
use crate::models::AccountContext;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Name of the session cookie set on login.
pub const AUTH_COOKIE: &str = "fitcoach_token";

/// App JWT lifetime.
pub const JWT_LIFETIME_SECS: usize = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (backend account UUID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub ctx: AccountContext,
}

/// Token from the session cookie, falling back to a bearer header.
pub fn token_from_request(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(AUTH_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Validate an app JWT and return the account it names.
pub fn decode_jwt(token: &str, signing_key: &[u8]) -> Result<Uuid, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Rejected app JWT");
        AppError::InvalidToken
    })?;

    token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::InvalidToken)
}

/// Middleware that requires a valid JWT and a live backend session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = token_from_request(&jar, request.headers()).ok_or(AppError::Unauthorized)?;
    let account_id = decode_jwt(&token, &state.config.jwt_signing_key)?;

    let ctx = state.sessions.current(account_id).await?;

    request
        .extensions_mut()
        .insert(AuthUser { account_id, ctx });

    Ok(next.run(request).await)
}

/// Create a JWT for a user session.
pub fn create_jwt(account_id: Uuid, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: account_id.to_string(),
        iat: now,
        exp: now + JWT_LIFETIME_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

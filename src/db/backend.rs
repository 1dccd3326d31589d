// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted backend client (auth + REST tables).
//!
//! Provides:
//! - Session issuance, refresh, verification and sign-out (auth service)
//! - Latest-row read and upsert of the profile table
//! - Read/write of the account-name table

use crate::db::tables;
use crate::error::{AppError, AuthFailure};
use crate::models::{AuthSession, BackendUser, ProfileRow, SignUpResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Everything the application consumes from the hosted backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Password sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    /// Create an account; the display name travels as user metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpResult, AppError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AppError>;

    /// Ask the backend who owns `access_token` (authoritative check).
    async fn get_user(&self, access_token: &str) -> Result<BackendUser, AppError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;

    /// Most recently created profile row for the account.
    async fn latest_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<ProfileRow>, AppError>;

    /// Write the row wholesale, keyed by `user_id`.
    async fn upsert_profile(&self, access_token: &str, row: &ProfileRow) -> Result<(), AppError>;

    async fn get_account_name(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<String>, AppError>;

    async fn set_account_name(
        &self,
        access_token: &str,
        user_id: Uuid,
        name: &str,
    ) -> Result<(), AppError>;
}

/// Client for a hosted auth (GoTrue-style) + REST (PostgREST-style) backend.
#[derive(Clone)]
pub struct SupabaseBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

/// Session payload returned by the auth service.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: BackendUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            user: self.user,
        }
    }
}

/// Error payload shapes used by the auth and REST services.
#[derive(Debug, Default, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    /// A string error code from REST, or the numeric HTTP status from auth
    #[serde(default)]
    code: Option<Value>,
    /// OAuth-style error name from the token endpoint
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl BackendErrorBody {
    fn error_code(&self) -> Option<&str> {
        self.error_code
            .as_deref()
            .or_else(|| self.code.as_ref().and_then(Value::as_str))
            .or(self.error.as_deref())
    }

    fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct NameRow {
    name: Option<String>,
}

impl SupabaseBackend {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Check an auth-service response, classifying failures.
    async fn check_auth_response(&self, response: reqwest::Response) -> Result<Value, AppError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)));
        }

        let body: BackendErrorBody = response.json().await.unwrap_or_default();
        let code = body.error_code();
        let failure = AuthFailure::classify(status.as_u16(), code, &body.message());

        tracing::warn!(
            status = status.as_u16(),
            code = ?code,
            failure = failure.code(),
            "Auth request rejected"
        );
        Err(AppError::Auth(failure))
    }

    /// Check a REST response; 401/403 means the session is no longer valid.
    async fn check_rest_response(&self, response: reqwest::Response) -> Result<String, AppError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            return Ok(body);
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AppError::Auth(AuthFailure::SessionExpired));
        }

        Err(AppError::Backend(format!("HTTP {}: {}", status, body)))
    }

    async fn token_request(&self, grant_type: &str, body: Value) -> Result<AuthSession, AppError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Auth request failed: {}", e)))?;

        let value = self.check_auth_response(response).await?;
        let token: TokenResponse = serde_json::from_value(value)
            .map_err(|e| AppError::Backend(format!("Unexpected session payload: {}", e)))?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.token_request("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpResult, AppError> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name }
            }))
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Sign-up request failed: {}", e)))?;

        let value = self.check_auth_response(response).await?;

        // With auto-confirm the payload is a full session; otherwise it is
        // the bare user awaiting confirmation.
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)
                .map_err(|e| AppError::Backend(format!("Unexpected session payload: {}", e)))?;
            let session = token.into_session();
            return Ok(SignUpResult {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user_value = value.get("user").cloned().unwrap_or(value);
        let user: BackendUser = serde_json::from_value(user_value)
            .map_err(|e| AppError::Backend(format!("Unexpected user payload: {}", e)))?;
        Ok(SignUpResult {
            user,
            session: None,
        })
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AppError> {
        self.token_request("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn get_user(&self, access_token: &str) -> Result<BackendUser, AppError> {
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("User request failed: {}", e)))?;

        let value = self.check_auth_response(response).await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::Backend(format!("Unexpected user payload: {}", e)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Sign-out request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }
        self.check_auth_response(response).await.map(|_| ())
    }

    async fn latest_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<ProfileRow>, AppError> {
        let response = self
            .http
            .get(self.rest_url(tables::USER_PROFILES))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        let body = self.check_rest_response(response).await?;
        let mut rows: Vec<ProfileRow> = serde_json::from_str(&body)
            .map_err(|e| AppError::Backend(format!("Unexpected profile payload: {}", e)))?;
        Ok(rows.pop())
    }

    async fn upsert_profile(&self, access_token: &str, row: &ProfileRow) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.rest_url(tables::USER_PROFILES))
            .header("apikey", &self.anon_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .bearer_auth(access_token)
            .query(&[("on_conflict", "user_id")])
            .json(row)
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        self.check_rest_response(response).await?;
        Ok(())
    }

    async fn get_account_name(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<String>, AppError> {
        let response = self
            .http
            .get(self.rest_url(tables::ACCOUNT_NAMES))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .query(&[
                ("select", "name".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        let body = self.check_rest_response(response).await?;
        let rows: Vec<NameRow> = serde_json::from_str(&body)
            .map_err(|e| AppError::Backend(format!("Unexpected name payload: {}", e)))?;
        Ok(rows.into_iter().next().and_then(|r| r.name))
    }

    async fn set_account_name(
        &self,
        access_token: &str,
        user_id: Uuid,
        name: &str,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.rest_url(tables::ACCOUNT_NAMES))
            .header("apikey", &self.anon_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .bearer_auth(access_token)
            .query(&[("on_conflict", "user_id")])
            .json(&json!({ "user_id": user_id, "name": name }))
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        self.check_rest_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_into_session() {
        let value = json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": "8d0f3b8e-3c55-4a4a-9a43-1f1c7d1f2b6a",
                "email": "lea@example.com",
                "email_confirmed_at": "2026-01-02T10:00:00Z"
            }
        });

        let session = serde_json::from_value::<TokenResponse>(value)
            .unwrap()
            .into_session();

        assert_eq!(session.access_token, "at");
        assert_eq!(session.user.email.as_deref(), Some("lea@example.com"));
        let remaining = session.expires_at - Utc::now();
        assert!(remaining > Duration::seconds(3500));
    }

    #[test]
    fn test_error_body_message_precedence() {
        let body: BackendErrorBody = serde_json::from_value(json!({
            "code": 400,
            "error_code": "email_not_confirmed",
            "msg": "Email not confirmed"
        }))
        .unwrap();
        assert_eq!(body.message(), "Email not confirmed");
        assert_eq!(body.error_code(), Some("email_not_confirmed"));

        let body: BackendErrorBody = serde_json::from_value(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        }))
        .unwrap();
        assert_eq!(body.message(), "Invalid login credentials");
    }

    #[test]
    fn test_urls() {
        let backend = SupabaseBackend::new("https://project.example.co/", "anon");
        assert_eq!(
            backend.auth_url("token"),
            "https://project.example.co/auth/v1/token"
        );
        assert_eq!(
            backend.rest_url(tables::USER_PROFILES),
            "https://project.example.co/rest/v1/user_profiles"
        );
    }
}

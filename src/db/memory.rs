// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend for tests and local development.
//!
//! Mirrors the hosted backend's observable behavior: passwords checked on
//! sign-in, opaque access/refresh tokens with an expiry, optional email
//! confirmation, and one profile row per account.

use crate::db::Backend;
use crate::error::{AppError, AuthFailure};
use crate::models::{AuthSession, BackendUser, ProfileRow, SignUpResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration as StdDuration;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
struct Account {
    id: Uuid,
    email: String,
    password: String,
    confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
struct IssuedToken {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// In-memory [`Backend`] implementation.
pub struct MemoryBackend {
    accounts: DashMap<String, Account>,
    access_tokens: DashMap<String, IssuedToken>,
    refresh_tokens: DashMap<String, Uuid>,
    profiles: DashMap<Uuid, ProfileRow>,
    names: DashMap<Uuid, String>,
    require_confirmation: AtomicBool,
    fail_profile_reads: AtomicBool,
    session_lifetime: Duration,
    latency_ms: AtomicU64,
    get_user_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    profile_writes: AtomicUsize,
    profile_reads: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}

impl MemoryBackend {
    /// Create a backend whose access tokens live for `session_lifetime`.
    pub fn new(session_lifetime: Duration) -> Self {
        Self {
            accounts: DashMap::new(),
            access_tokens: DashMap::new(),
            refresh_tokens: DashMap::new(),
            profiles: DashMap::new(),
            names: DashMap::new(),
            require_confirmation: AtomicBool::new(false),
            fail_profile_reads: AtomicBool::new(false),
            session_lifetime,
            latency_ms: AtomicU64::new(0),
            get_user_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            profile_writes: AtomicUsize::new(0),
            profile_reads: AtomicUsize::new(0),
        }
    }

    /// Make new registrations wait for email confirmation.
    pub fn set_require_confirmation(&self, required: bool) {
        self.require_confirmation.store(required, Ordering::SeqCst);
    }

    /// Confirm an address registered while confirmation was required.
    pub fn confirm_email(&self, email: &str) {
        if let Some(mut account) = self.accounts.get_mut(&normalize(email)) {
            account.confirmed_at = Some(Utc::now());
        }
    }

    /// Make profile reads fail as an unreachable table would.
    pub fn set_fail_profile_reads(&self, fail: bool) {
        self.fail_profile_reads.store(fail, Ordering::SeqCst);
    }

    /// Delay every call by `latency`, like a network round trip.
    pub fn set_latency(&self, latency: StdDuration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn round_trip(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(StdDuration::from_millis(ms)).await;
        }
    }

    /// Invalidate every token of an account, as an admin sign-out would.
    pub fn revoke_sessions(&self, user_id: Uuid) {
        self.access_tokens.retain(|_, t| t.user_id != user_id);
        self.refresh_tokens.retain(|_, id| *id != user_id);
    }

    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }

    pub fn profile_reads(&self) -> usize {
        self.profile_reads.load(Ordering::SeqCst)
    }

    /// Store a raw row directly (seeding tests).
    pub fn insert_row(&self, row: ProfileRow) {
        self.profiles.insert(row.user_id, row);
    }

    fn issue_session(&self, account: &Account) -> AuthSession {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_lifetime;

        self.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id: account.id,
                expires_at,
            },
        );
        self.refresh_tokens.insert(refresh_token.clone(), account.id);

        AuthSession {
            access_token,
            refresh_token,
            expires_at,
            user: account.to_user(),
        }
    }

    fn account_by_id(&self, user_id: Uuid) -> Option<Account> {
        self.accounts
            .iter()
            .find(|a| a.id == user_id)
            .map(|a| a.value().clone())
    }

    /// Resolve a bearer token to its owner, rejecting expired tokens.
    fn authorize(&self, access_token: &str) -> Result<Uuid, AppError> {
        let token = self
            .access_tokens
            .get(access_token)
            .map(|t| t.value().clone())
            .ok_or(AppError::Auth(AuthFailure::SessionExpired))?;

        if token.expires_at <= Utc::now() {
            return Err(AppError::Auth(AuthFailure::SessionExpired));
        }
        Ok(token.user_id)
    }

    /// Row-level security: a token only reaches its owner's rows.
    fn authorize_owner(&self, access_token: &str, user_id: Uuid) -> Result<(), AppError> {
        if self.authorize(access_token)? != user_id {
            return Err(AppError::Backend(
                "Row-level security violation".to_string(),
            ));
        }
        Ok(())
    }
}

impl Account {
    fn to_user(&self) -> BackendUser {
        BackendUser {
            id: self.id,
            email: Some(self.email.clone()),
            email_confirmed_at: self.confirmed_at,
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.round_trip().await;
        let account = self
            .accounts
            .get(&normalize(email))
            .map(|a| a.value().clone())
            .filter(|a| a.password == password)
            .ok_or(AppError::Auth(AuthFailure::InvalidCredentials))?;

        if account.confirmed_at.is_none() {
            return Err(AppError::Auth(AuthFailure::EmailNotConfirmed));
        }

        Ok(self.issue_session(&account))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpResult, AppError> {
        self.round_trip().await;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Auth(AuthFailure::WeakPassword));
        }

        let key = normalize(email);
        if self.accounts.contains_key(&key) {
            return Err(AppError::Auth(AuthFailure::UserAlreadyExists));
        }

        let confirmed_at = if self.require_confirmation.load(Ordering::SeqCst) {
            None
        } else {
            Some(Utc::now())
        };

        let account = Account {
            id: Uuid::new_v4(),
            email: key.clone(),
            password: password.to_string(),
            confirmed_at,
        };
        self.accounts.insert(key, account.clone());
        if !name.is_empty() {
            self.names.insert(account.id, name.to_string());
        }

        let session = account
            .confirmed_at
            .is_some()
            .then(|| self.issue_session(&account));

        Ok(SignUpResult {
            user: account.to_user(),
            session,
        })
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AppError> {
        self.round_trip().await;
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        // Refresh tokens are single use.
        let (_, user_id) = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AppError::Auth(AuthFailure::SessionExpired))?;

        let account = self
            .account_by_id(user_id)
            .ok_or(AppError::Auth(AuthFailure::SessionExpired))?;

        Ok(self.issue_session(&account))
    }

    async fn get_user(&self, access_token: &str) -> Result<BackendUser, AppError> {
        self.round_trip().await;
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);

        let user_id = self.authorize(access_token)?;
        self.account_by_id(user_id)
            .map(|a| a.to_user())
            .ok_or(AppError::Auth(AuthFailure::SessionExpired))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        self.round_trip().await;
        let user_id = self.authorize(access_token)?;
        self.revoke_sessions(user_id);
        Ok(())
    }

    async fn latest_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<ProfileRow>, AppError> {
        self.round_trip().await;
        self.authorize_owner(access_token, user_id)?;
        self.profile_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_profile_reads.load(Ordering::SeqCst) {
            return Err(AppError::Backend("profile table unavailable (503)".to_string()));
        }
        Ok(self.profiles.get(&user_id).map(|r| r.value().clone()))
    }

    async fn upsert_profile(&self, access_token: &str, row: &ProfileRow) -> Result<(), AppError> {
        self.round_trip().await;
        self.authorize_owner(access_token, row.user_id)?;
        self.profile_writes.fetch_add(1, Ordering::SeqCst);

        let now = Utc::now();
        let mut stored = row.clone();
        match self.profiles.get(&row.user_id) {
            Some(existing) => {
                stored.id = existing.id;
                stored.created_at = existing.created_at;
            }
            None => {
                stored.id = Some(Uuid::new_v4());
                stored.created_at = Some(now);
            }
        }
        stored.updated_at = row.updated_at.or(Some(now));

        self.profiles.insert(row.user_id, stored);
        Ok(())
    }

    async fn get_account_name(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<String>, AppError> {
        self.round_trip().await;
        self.authorize_owner(access_token, user_id)?;
        Ok(self.names.get(&user_id).map(|n| n.value().clone()))
    }

    async fn set_account_name(
        &self,
        access_token: &str,
        user_id: Uuid,
        name: &str,
    ) -> Result<(), AppError> {
        self.round_trip().await;
        self.authorize_owner(access_token, user_id)?;
        self.names.insert(user_id, name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let backend = MemoryBackend::default();
        backend.sign_up("a@example.com", "secret1", "Ana").await.unwrap();

        let err = backend.sign_in("a@example.com", "wrong!!").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthFailure::InvalidCredentials)));

        let session = backend.sign_in("A@Example.com", "secret1").await.unwrap();
        assert_eq!(session.user.email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn test_unconfirmed_email_is_rejected() {
        let backend = MemoryBackend::default();
        backend.set_require_confirmation(true);

        let result = backend.sign_up("b@example.com", "secret1", "").await.unwrap();
        assert!(result.session.is_none());

        let err = backend.sign_in("b@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthFailure::EmailNotConfirmed)));

        backend.confirm_email("b@example.com");
        assert!(backend.sign_in("b@example.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let backend = MemoryBackend::default();
        let session = backend
            .sign_up("c@example.com", "secret1", "")
            .await
            .unwrap()
            .session
            .unwrap();

        let renewed = backend.refresh_session(&session.refresh_token).await.unwrap();
        assert_ne!(renewed.access_token, session.access_token);
        assert!(backend.refresh_session(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_rows_are_owner_scoped() {
        let backend = MemoryBackend::default();
        let a = backend.sign_up("d@example.com", "secret1", "").await.unwrap().session.unwrap();
        let b = backend.sign_up("e@example.com", "secret1", "").await.unwrap().session.unwrap();

        let row = ProfileRow {
            user_id: a.user.id,
            ..Default::default()
        };
        assert!(backend.upsert_profile(&b.access_token, &row).await.is_err());
        assert!(backend.upsert_profile(&a.access_token, &row).await.is_ok());
        assert!(backend
            .latest_profile(&a.access_token, a.user.id)
            .await
            .unwrap()
            .is_some());
    }
}

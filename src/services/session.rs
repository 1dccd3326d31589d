// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: the single source of truth for who is logged in.
//!
//! Backend sessions are kept per account with the time they were last
//! confirmed by the backend. Within the staleness window a cached session is
//! trusted as is; past it, the next caller revalidates with the backend while
//! concurrent callers for the same account wait and reuse that answer.
//!
//! The store holds a bounded number of accounts. A session nobody used for
//! the idle timeout is dropped, and so is the least recently used one when
//! the store is full; either way the account has to log in again.

use crate::db::Backend;
use crate::error::{AppError, AuthFailure};
use crate::models::{AccountContext, AuthSession, SignUpResult};
use crate::services::cache::QueryCache;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Refresh the backend token when it expires within this margin.
const SESSION_REFRESH_MARGIN_SECS: i64 = 60;

/// Backend session plus the last time the backend vouched for it.
#[derive(Clone)]
pub struct CachedSession {
    session: AuthSession,
    checked_at: Instant,
}

/// Shared session cache type.
pub type SessionCache = Arc<QueryCache<Uuid, CachedSession>>;

/// Shared per-account lock type for single-flight revalidation.
///
/// A lock only stays in the map while some task holds or waits on it.
pub type RefreshLocks = Arc<DashMap<Uuid, Arc<Mutex<()>>>>;

/// What the client needs to decide between the login screen and the app.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// The session question has been answered (either way)
    pub session_checked: bool,
    /// The profile load finished (with data or with defaults)
    pub profile_resolved: bool,
    /// `session_checked && profile_resolved` with a valid session
    pub authenticated: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub account_id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl SessionStatus {
    pub fn anonymous() -> Self {
        Self {
            session_checked: true,
            profile_resolved: false,
            authenticated: false,
            account_id: None,
            email: None,
            name: None,
        }
    }

    pub fn signed_in(
        account_id: Uuid,
        email: Option<String>,
        name: Option<String>,
        profile_resolved: bool,
    ) -> Self {
        Self {
            session_checked: true,
            profile_resolved,
            authenticated: profile_resolved,
            account_id: Some(account_id),
            email,
            name,
        }
    }
}

/// Login, registration, logout and session verification.
#[derive(Clone)]
pub struct SessionService {
    backend: Arc<dyn Backend>,
    cache: SessionCache,
    refresh_locks: RefreshLocks,
    stale_after: Duration,
}

impl SessionService {
    pub fn new(
        backend: Arc<dyn Backend>,
        stale_after: Duration,
        max_accounts: usize,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            cache: Arc::new(QueryCache::new(max_accounts, idle_timeout)),
            refresh_locks: Arc::new(DashMap::new()),
            stale_after,
        }
    }

    // ─── Identity Operations ─────────────────────────────────────────────────

    /// Sign in with email and password; the session becomes current.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let session = self.backend.sign_in(email, password).await?;
        tracing::info!(account_id = %session.user.id, "Login successful");
        self.store(session.clone()).await;
        Ok(session)
    }

    /// Create an account and record its display name.
    ///
    /// When the backend returns a session right away it becomes current;
    /// otherwise the address has to be confirmed before logging in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpResult, AppError> {
        let result = self.backend.sign_up(email, password, name).await?;

        match &result.session {
            Some(session) => {
                if let Err(e) = self
                    .backend
                    .set_account_name(&session.access_token, session.user.id, name)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to store account name, continuing anyway");
                }
                self.store(session.clone()).await;
                tracing::info!(account_id = %result.user.id, "Registration complete");
            }
            None => {
                tracing::info!(
                    account_id = %result.user.id,
                    "Registration pending email confirmation"
                );
            }
        }

        Ok(result)
    }

    /// End the session. The local entry is removed even if the backend call fails.
    pub async fn logout(&self, account_id: Uuid) {
        let removed = self.cache.remove(&account_id).await;

        if let Some(cached) = removed {
            if let Err(e) = self.backend.sign_out(&cached.session.access_token).await {
                tracing::warn!(error = %e, %account_id, "Backend sign-out failed");
            }
        }
        tracing::info!(%account_id, "Logged out");
    }

    /// Force a token refresh.
    ///
    /// Concurrent calls collapse into one backend refresh: a caller that waited
    /// on the lock reuses a refresh that completed after it asked.
    pub async fn refresh_session(&self, account_id: Uuid) -> Result<AuthSession, AppError> {
        let requested_at = Instant::now();
        let result = {
            let lock = self.lock_for(account_id);
            let _guard = lock.lock().await;
            self.refresh_after(account_id, requested_at).await
        };
        self.release_lock(account_id);
        result
    }

    // ─── Verification ────────────────────────────────────────────────────────

    /// Resolve the current backend session for an account.
    ///
    /// 1. Cache hit checked within the staleness window → return (no I/O)
    /// 2. Acquire the account's lock; re-check (another task may have done it)
    /// 3. Token about to expire → refresh; otherwise revalidate with the backend
    /// 4. Backend denial → drop the cached session and require a new login
    pub async fn current(&self, account_id: Uuid) -> Result<AccountContext, AppError> {
        if let Some(ctx) = self.fresh_context(account_id).await {
            return Ok(ctx);
        }

        let result = {
            let lock = self.lock_for(account_id);
            let _guard = lock.lock().await;
            self.verify_locked(account_id).await
        };
        self.release_lock(account_id);
        result
    }

    /// Look up the display name of the account.
    pub async fn account_name(&self, ctx: &AccountContext) -> Result<Option<String>, AppError> {
        self.backend
            .get_account_name(&ctx.access_token, ctx.account_id)
            .await
    }

    /// Build the client-facing status for a signed-in account.
    ///
    /// A failed name lookup is logged and leaves the name empty.
    pub async fn status(&self, ctx: &AccountContext, profile_resolved: bool) -> SessionStatus {
        let name = match self.account_name(ctx).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(
                    account_id = %ctx.account_id,
                    error = %e,
                    "Failed to load account name"
                );
                None
            }
        };

        let email = self.email(ctx.account_id).await;
        SessionStatus::signed_in(ctx.account_id, email, name, profile_resolved)
    }

    /// Email of the cached session, if any.
    pub async fn email(&self, account_id: Uuid) -> Option<String> {
        self.cache
            .get(&account_id)
            .await
            .and_then(|c| c.session.user.email)
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    async fn store(&self, session: AuthSession) {
        self.cache
            .insert(
                session.user.id,
                CachedSession {
                    session,
                    checked_at: Instant::now(),
                },
            )
            .await;
    }

    fn lock_for(&self, account_id: Uuid) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the account's lock unless another task still holds or awaits it.
    fn release_lock(&self, account_id: Uuid) {
        self.refresh_locks
            .remove_if(&account_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn fresh_context(&self, account_id: Uuid) -> Option<AccountContext> {
        let cached = self.cache.get(&account_id).await?;
        if cached.checked_at.elapsed() < self.stale_after && !is_expiring(&cached.session) {
            Some(context(&cached.session))
        } else {
            None
        }
    }

    /// Must be called with the account's lock held.
    async fn verify_locked(&self, account_id: Uuid) -> Result<AccountContext, AppError> {
        if let Some(ctx) = self.fresh_context(account_id).await {
            return Ok(ctx);
        }

        let cached = self
            .cache
            .get(&account_id)
            .await
            .ok_or(AppError::Unauthorized)?;

        let session = if is_expiring(&cached.session) {
            tracing::info!(%account_id, "Backend token expiring, refreshing");
            self.refresh_locked(account_id, &cached.session.refresh_token)
                .await?
        } else {
            self.revalidate_locked(account_id, cached.session).await?
        };

        Ok(context(&session))
    }

    /// Must be called with the account's lock held.
    async fn refresh_after(
        &self,
        account_id: Uuid,
        requested_at: Instant,
    ) -> Result<AuthSession, AppError> {
        let cached = self
            .cache
            .get(&account_id)
            .await
            .ok_or(AppError::Unauthorized)?;

        if cached.checked_at > requested_at {
            return Ok(cached.session);
        }

        self.refresh_locked(account_id, &cached.session.refresh_token)
            .await
    }

    /// Must be called with the account's lock held.
    async fn refresh_locked(
        &self,
        account_id: Uuid,
        refresh_token: &str,
    ) -> Result<AuthSession, AppError> {
        match self.backend.refresh_session(refresh_token).await {
            Ok(session) => {
                self.store(session.clone()).await;
                tracing::info!(%account_id, "Session refreshed");
                Ok(session)
            }
            Err(e) => Err(self.forget_on_denial(account_id, e).await),
        }
    }

    /// Must be called with the account's lock held.
    async fn revalidate_locked(
        &self,
        account_id: Uuid,
        session: AuthSession,
    ) -> Result<AuthSession, AppError> {
        match self.backend.get_user(&session.access_token).await {
            Ok(user) if user.id == account_id => {
                let session = AuthSession { user, ..session };
                self.store(session.clone()).await;
                tracing::debug!(%account_id, "Session revalidated");
                Ok(session)
            }
            Ok(user) => {
                tracing::error!(
                    %account_id,
                    other = %user.id,
                    "Backend token belongs to another account"
                );
                self.cache.invalidate(&account_id).await;
                Err(AppError::Unauthorized)
            }
            Err(e) => Err(self.forget_on_denial(account_id, e).await),
        }
    }

    /// The backend is authoritative: if it rejects the session, so do we.
    async fn forget_on_denial(&self, account_id: Uuid, error: AppError) -> AppError {
        if matches!(
            error,
            AppError::Auth(AuthFailure::SessionExpired | AuthFailure::InvalidCredentials)
        ) || error.is_session_error()
        {
            tracing::info!(%account_id, "Backend rejected cached session, dropping it");
            self.cache.invalidate(&account_id).await;
            return AppError::Unauthorized;
        }
        error
    }
}

fn is_expiring(session: &AuthSession) -> bool {
    session.expires_at <= Utc::now() + chrono::Duration::seconds(SESSION_REFRESH_MARGIN_SECS)
}

fn context(session: &AuthSession) -> AccountContext {
    AccountContext {
        account_id: session.user.id,
        access_token: session.access_token.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBackend;

    async fn setup(backend: Arc<MemoryBackend>) -> (SessionService, Uuid) {
        let service = SessionService::new(
            backend,
            Duration::from_secs(300),
            100,
            Duration::from_secs(30 * 86_400),
        );
        let account_id = register(&service, "coach@example.com").await;
        (service, account_id)
    }

    async fn register(service: &SessionService, email: &str) -> Uuid {
        service
            .register(email, "secret1", "Camille")
            .await
            .unwrap()
            .user
            .id
    }

    #[tokio::test]
    async fn test_least_recently_used_session_is_evicted_when_full() {
        let backend = Arc::new(MemoryBackend::default());
        let service = SessionService::new(
            backend,
            Duration::from_secs(300),
            2,
            Duration::from_secs(3600),
        );

        let first = register(&service, "un@example.com").await;
        let second = register(&service, "deux@example.com").await;
        service.current(first).await.unwrap();

        let third = register(&service, "trois@example.com").await;

        assert!(matches!(
            service.current(second).await,
            Err(AppError::Unauthorized)
        ));
        assert!(service.current(first).await.is_ok());
        assert!(service.current(third).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_dropped() {
        let backend = Arc::new(MemoryBackend::default());
        let service = SessionService::new(
            backend,
            Duration::from_secs(300),
            10,
            Duration::from_secs(3600),
        );
        let account_id = register(&service, "coach@example.com").await;

        tokio::time::advance(Duration::from_secs(3601)).await;

        assert!(matches!(
            service.current(account_id).await,
            Err(AppError::Unauthorized)
        ));
        assert!(service.email(account_id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_locks_are_released_after_use() {
        let backend = Arc::new(MemoryBackend::default());
        let (service, account_id) = setup(backend).await;

        tokio::time::advance(Duration::from_secs(301)).await;
        service.current(account_id).await.unwrap();
        service.refresh_session(account_id).await.unwrap();

        assert!(service.refresh_locks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_session_skips_backend() {
        let backend = Arc::new(MemoryBackend::default());
        let (service, account_id) = setup(backend.clone()).await;

        let ctx = service.current(account_id).await.unwrap();
        assert_eq!(ctx.account_id, account_id);
        assert_eq!(backend.get_user_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_session_revalidates_once_for_concurrent_callers() {
        let backend = Arc::new(MemoryBackend::default());
        let (service, account_id) = setup(backend.clone()).await;

        tokio::time::advance(Duration::from_secs(301)).await;

        let calls: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.current(account_id).await })
            })
            .collect();
        for call in calls {
            assert!(call.await.unwrap().is_ok());
        }

        assert_eq!(backend.get_user_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_denial_drops_session() {
        let backend = Arc::new(MemoryBackend::default());
        let (service, account_id) = setup(backend.clone()).await;

        backend.revoke_sessions(account_id);
        tokio::time::advance(Duration::from_secs(301)).await;

        let err = service.current(account_id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert!(service.email(account_id).await.is_none());
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let backend = Arc::new(MemoryBackend::new(chrono::Duration::seconds(30)));
        let (service, account_id) = setup(backend.clone()).await;

        let before = service
            .cache
            .get(&account_id)
            .await
            .unwrap()
            .session
            .access_token;
        let ctx = service.current(account_id).await.unwrap();

        assert_ne!(ctx.access_token, before);
        assert_eq!(backend.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_manual_refresh_hits_backend_once() {
        let backend = Arc::new(MemoryBackend::default());
        let (service, account_id) = setup(backend.clone()).await;
        backend.set_latency(Duration::from_millis(200));

        let (a, b) = tokio::join!(
            service.refresh_session(account_id),
            service.refresh_session(account_id)
        );

        assert_eq!(a.unwrap().access_token, b.unwrap().access_token);
        assert_eq!(backend.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_logout_removes_session() {
        let backend = Arc::new(MemoryBackend::default());
        let (service, account_id) = setup(backend.clone()).await;

        service.logout(account_id).await;

        assert!(matches!(
            service.current(account_id).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_backend_reason() {
        let backend = Arc::new(MemoryBackend::default());
        let (service, _) = setup(backend).await;

        let err = service
            .login("coach@example.com", "not-the-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthFailure::InvalidCredentials)));
    }
}

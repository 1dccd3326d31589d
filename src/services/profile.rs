// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile loading and saving against the hosted profile table.

use crate::db::Backend;
use crate::error::AppError;
use crate::models::{AccountContext, ProfileRow, UserProfile};
use crate::services::cache::QueryCache;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Loads and saves the questionnaire, memoizing loads per account.
#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn Backend>,
    cache: Arc<QueryCache<Uuid, UserProfile>>,
}

impl ProfileService {
    pub fn new(backend: Arc<dyn Backend>, cache_capacity: usize, cache_ttl: Duration) -> Self {
        Self {
            backend,
            cache: Arc::new(QueryCache::new(cache_capacity, cache_ttl)),
        }
    }

    /// Load the account's latest profile.
    ///
    /// Without an account, or when the account never saved anything, this is
    /// the all-zero default profile.
    pub async fn load_user_data(
        &self,
        ctx: Option<&AccountContext>,
    ) -> Result<UserProfile, AppError> {
        let Some(ctx) = ctx else {
            return Ok(UserProfile::default());
        };

        if let Some(profile) = self.cache.get(&ctx.account_id).await {
            return Ok(profile);
        }

        let profile = self
            .backend
            .latest_profile(&ctx.access_token, ctx.account_id)
            .await?
            .map(UserProfile::from)
            .unwrap_or_default();

        tracing::debug!(
            account_id = %ctx.account_id,
            blank = profile.is_blank(),
            "Profile loaded"
        );

        self.cache.insert(ctx.account_id, profile.clone()).await;
        Ok(profile)
    }

    /// Overwrite the account's profile with `data` (last write wins).
    ///
    /// Rejects before any network call when there is no account or no data.
    pub async fn save_user_data(
        &self,
        ctx: Option<&AccountContext>,
        data: Option<&UserProfile>,
    ) -> Result<UserProfile, AppError> {
        let Some(ctx) = ctx else {
            tracing::warn!("Profile save attempted without an account");
            return Err(AppError::Unauthorized);
        };
        let Some(data) = data else {
            return Err(AppError::BadRequest("No profile data to save".to_string()));
        };

        let mut profile = data.clone();
        profile.updated_at = Some(Utc::now());

        let row = ProfileRow::from_profile(ctx.account_id, &profile);
        self.backend.upsert_profile(&ctx.access_token, &row).await?;

        tracing::info!(account_id = %ctx.account_id, "Profile saved");

        self.cache.insert(ctx.account_id, profile.clone()).await;
        Ok(profile)
    }

    /// Drop the memoized profile so the next load hits the backend.
    pub async fn forget(&self, account_id: Uuid) {
        self.cache.invalidate(&account_id).await;
    }
}

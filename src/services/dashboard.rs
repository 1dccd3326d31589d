// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard panels: one generated document per content kind and account.
//!
//! Each panel follows [`PageState`]. A generation runs as a background task so
//! a client that goes away does not cancel it, and at most one generation per
//! panel is in flight; later requests join the running one.
//!
//! A result generated from a profile that was replaced while it ran is
//! thrown away. Settled panels nobody regenerated within the idle timeout
//! are pruned.

use crate::error::AppError;
use crate::models::{AccountContext, ContentKind, GeneratedContent, SupplementList, UserProfile};
use crate::services::generation::GenerationService;
use crate::services::page_state::{self, LoadPolicy, PageState};
use crate::services::profile::ProfileService;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// After this long without a result a panel shows as degraded.
pub const DEFAULT_DEGRADED_AFTER: Duration = Duration::from_secs(8);

/// Bump when the cached supplement document changes shape.
pub const SUPPLEMENT_CACHE_SCHEMA: u32 = 1;

type PanelKey = (Uuid, ContentKind);
type InFlight = Shared<BoxFuture<'static, ()>>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub state: PageState,
    pub content: Option<GeneratedContent>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Content came from the supplement cache rather than a fresh generation.
    pub from_cache: bool,
    /// Fingerprint of the profile the panel is meant to show content for
    #[serde(skip)]
    profile_fingerprint: Option<String>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            state: PageState::Idle,
            content: None,
            error: None,
            updated_at: None,
            from_cache: false,
            profile_fingerprint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub kind: ContentKind,
    #[serde(flatten)]
    pub panel: PanelState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub profile_complete: bool,
    pub panels: Vec<PanelView>,
}

// ─── Supplement cache ────────────────────────────────────────

#[derive(Debug, Clone)]
struct CachedSupplements {
    schema: u32,
    fingerprint: String,
    generated_at: DateTime<Utc>,
    list: SupplementList,
}

/// Last supplement list per account, valid for one profile fingerprint.
pub struct SupplementCache {
    entries: DashMap<Uuid, CachedSupplements>,
    ttl: chrono::Duration,
}

impl SupplementCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: to_chrono(ttl),
        }
    }

    /// The cached list if it was generated from `fingerprint` and is younger
    /// than the TTL at `now`.
    pub fn lookup(
        &self,
        account_id: Uuid,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Option<SupplementList> {
        let entry = self.entries.get(&account_id)?;
        let valid = entry.schema == SUPPLEMENT_CACHE_SCHEMA
            && entry.fingerprint == fingerprint
            && now.signed_duration_since(entry.generated_at) < self.ttl;

        if valid {
            Some(entry.list.clone())
        } else {
            drop(entry);
            self.entries.remove(&account_id);
            None
        }
    }

    /// Store a list, dropping every entry that expired by `generated_at`.
    pub fn store(
        &self,
        account_id: Uuid,
        fingerprint: String,
        list: SupplementList,
        generated_at: DateTime<Utc>,
    ) {
        self.entries
            .retain(|_, entry| generated_at.signed_duration_since(entry.generated_at) < self.ttl);
        self.entries.insert(
            account_id,
            CachedSupplements {
                schema: SUPPLEMENT_CACHE_SCHEMA,
                fingerprint,
                generated_at,
                list,
            },
        );
    }

    pub fn invalidate(&self, account_id: Uuid) {
        self.entries.remove(&account_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

// ─── Service ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct DashboardService {
    profiles: ProfileService,
    generation: GenerationService,
    panels: Arc<DashMap<PanelKey, PanelState>>,
    in_flight: Arc<DashMap<PanelKey, InFlight>>,
    supplements: Arc<SupplementCache>,
    degraded_after: Duration,
    idle_timeout: chrono::Duration,
}

impl DashboardService {
    pub fn new(
        profiles: ProfileService,
        generation: GenerationService,
        supplement_ttl: Duration,
        degraded_after: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            generation,
            panels: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            supplements: Arc::new(SupplementCache::new(supplement_ttl)),
            degraded_after,
            idle_timeout: to_chrono(idle_timeout),
        }
    }

    pub fn panel(&self, account_id: Uuid, kind: ContentKind) -> PanelView {
        let panel = self
            .panels
            .get(&(account_id, kind))
            .map(|p| p.value().clone())
            .unwrap_or_default();
        PanelView { kind, panel }
    }

    /// All three panels; idle ones start generating when the profile has data.
    pub async fn overview(&self, ctx: &AccountContext) -> Result<DashboardOverview, AppError> {
        let profile = self.profiles.load_user_data(Some(ctx)).await?;
        let profile_complete = !profile.is_blank();

        if profile_complete {
            for kind in ContentKind::ALL {
                if self.panel(ctx.account_id, kind).panel.state == PageState::Idle {
                    self.start(ctx, kind, false).await?;
                }
            }
        }

        Ok(DashboardOverview {
            profile_complete,
            panels: ContentKind::ALL
                .iter()
                .map(|kind| self.panel(ctx.account_id, *kind))
                .collect(),
        })
    }

    /// Generate `kind` and wait for the outcome.
    ///
    /// Joins a generation already running for this panel. Failures are kept on
    /// the panel rather than returned, so the caller can offer a retry.
    pub async fn generate(
        &self,
        ctx: &AccountContext,
        kind: ContentKind,
        force: bool,
    ) -> Result<PanelView, AppError> {
        // A run superseded by a profile change leaves the panel idle; one
        // more run picks up the new profile.
        for _ in 0..2 {
            match self.start(ctx, kind, force).await? {
                Some(task) => task.await,
                None => break,
            }
            if self.panel(ctx.account_id, kind).panel.state != PageState::Idle {
                break;
            }
        }
        Ok(self.panel(ctx.account_id, kind))
    }

    /// Drop cached supplements and settled panels after the profile changed.
    ///
    /// Panels with a generation in flight are retargeted at the new profile,
    /// so the result of the old one is discarded when it lands.
    pub fn profile_changed(&self, account_id: Uuid, profile: &UserProfile) {
        let fingerprint = profile.fingerprint();
        self.supplements.invalidate(account_id);
        for kind in ContentKind::ALL {
            let key = (account_id, kind);
            if self.in_flight.contains_key(&key) {
                if let Some(mut panel) = self.panels.get_mut(&key) {
                    panel.profile_fingerprint = Some(fingerprint.clone());
                }
            } else {
                self.panels.remove(&key);
            }
        }
    }

    /// Drop settled panels last updated before the idle timeout at `now`.
    pub fn prune_idle(&self, now: DateTime<Utc>) {
        let cutoff = now - self.idle_timeout;
        let before = self.panels.len();
        self.panels.retain(|_, panel| {
            panel.state.is_pending() || panel.updated_at.is_some_and(|at| at > cutoff)
        });
        let pruned = before.saturating_sub(self.panels.len());
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned idle dashboard panels");
        }
    }

    /// Forget everything held for the account.
    pub fn forget(&self, account_id: Uuid) {
        self.supplements.invalidate(account_id);
        self.panels.retain(|(id, _), _| *id != account_id);
    }

    async fn start(
        &self,
        ctx: &AccountContext,
        kind: ContentKind,
        force: bool,
    ) -> Result<Option<InFlight>, AppError> {
        let key = (ctx.account_id, kind);
        if let Some(task) = self.in_flight.get(&key) {
            tracing::debug!(
                account_id = %ctx.account_id,
                content_type = %kind,
                "Joining generation in flight"
            );
            return Ok(Some(task.value().clone()));
        }

        let profile = self.profiles.load_user_data(Some(ctx)).await?;
        let fingerprint = profile.fingerprint();

        if kind == ContentKind::Supplements && !force {
            if let Some(list) = self
                .supplements
                .lookup(ctx.account_id, &fingerprint, Utc::now())
            {
                tracing::debug!(account_id = %ctx.account_id, "Serving cached supplements");
                self.panels.insert(
                    key,
                    PanelState {
                        state: PageState::Ready,
                        content: Some(GeneratedContent::Supplements(list)),
                        error: None,
                        updated_at: Some(Utc::now()),
                        from_cache: true,
                        profile_fingerprint: Some(fingerprint),
                    },
                );
                return Ok(None);
            }
        }

        self.prune_idle(Utc::now());

        let task = match self.in_flight.entry(key) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                {
                    let mut panel = self.panels.entry(key).or_default();
                    panel.state = PageState::Loading;
                    panel.error = None;
                    panel.profile_fingerprint = Some(fingerprint.clone());
                }
                let this = self.clone();
                let handle = tokio::spawn(async move {
                    this.run_generation(key, profile, fingerprint).await;
                });
                let task: InFlight = async move {
                    if let Err(e) = handle.await {
                        tracing::error!(error = %e, "Generation task failed to complete");
                    }
                }
                .boxed()
                .shared();
                slot.insert(task.clone());
                task
            }
        };
        Ok(Some(task))
    }

    async fn run_generation(
        &self,
        key: PanelKey,
        profile: UserProfile,
        fingerprint: String,
    ) {
        let (account_id, kind) = key;
        let policy = LoadPolicy::new(self.degraded_after, self.generation.timeout());
        let panels = self.panels.clone();
        let mut settled = PageState::Idle;

        let result = page_state::drive(
            self.generation.request_content(&profile, kind),
            policy,
            |state| {
                if state.is_pending() {
                    let mut panel = panels.entry(key).or_default();
                    panel.state = state;
                    panel.error = None;
                }
                settled = state;
            },
        )
        .await;

        {
            let mut panel = self.panels.entry(key).or_default();
            let superseded = panel
                .profile_fingerprint
                .as_deref()
                .is_some_and(|wanted| wanted != fingerprint);

            if superseded {
                tracing::info!(
                    %account_id,
                    content_type = %kind,
                    "Profile changed during generation, discarding result"
                );
                *panel = PanelState::default();
                drop(panel);
                self.in_flight.remove(&key);
                return;
            }

            panel.state = settled;
            panel.updated_at = Some(Utc::now());

            match result {
                Ok(content) => {
                    if let GeneratedContent::Supplements(list) = &content {
                        self.supplements
                            .store(account_id, fingerprint, list.clone(), Utc::now());
                    }
                    tracing::info!(%account_id, content_type = %kind, "Panel content generated");
                    panel.content = Some(content);
                    panel.error = None;
                    panel.from_cache = false;
                }
                Err(e) => {
                    tracing::warn!(
                        %account_id,
                        content_type = %kind,
                        error = %e,
                        "Panel generation failed"
                    );
                    panel.error = Some(e.to_string());
                }
            }
        }

        self.in_flight.remove(&key);
    }
}

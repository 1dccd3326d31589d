// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FitCoach: personalised fitness coaching backend
//!
//! This crate provides the backend API behind the FitCoach web client:
//! account sessions, the fitness questionnaire, and the dashboard of
//! AI-generated nutrition, supplement and flexibility recommendations.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Backend;
use services::{
    dashboard::DEFAULT_DEGRADED_AFTER, wizard::DRAFT_IDLE_TIMEOUT, DashboardService,
    GenerationService, LlmProvider, ProfileService, SessionService, WizardStore,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub sessions: SessionService,
    pub profiles: ProfileService,
    pub generation: GenerationService,
    pub dashboard: DashboardService,
    pub wizards: WizardStore,
}

impl AppState {
    /// Wire the services together over one backend and one LLM provider.
    pub fn new(config: Config, backend: Arc<dyn Backend>, llm: Arc<dyn LlmProvider>) -> Self {
        let sessions = SessionService::new(
            backend.clone(),
            config.session_stale_after,
            config.max_tracked_accounts,
            config.session_idle_timeout,
        );
        let profiles = ProfileService::new(
            backend.clone(),
            config.cache_max_entries,
            config.cache_ttl,
        );
        let generation = GenerationService::new(llm, config.generation_timeout);
        let dashboard = DashboardService::new(
            profiles.clone(),
            generation.clone(),
            config.supplement_cache_ttl,
            DEFAULT_DEGRADED_AFTER,
            config.session_idle_timeout,
        );
        let wizards = WizardStore::new(
            profiles.clone(),
            config.max_tracked_accounts,
            DRAFT_IDLE_TIMEOUT,
        );

        Self {
            config,
            backend,
            sessions,
            profiles,
            generation,
            dashboard,
            wizards,
        }
    }
}

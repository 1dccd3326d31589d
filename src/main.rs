// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitCoach API Server
//!
//! Backend for the FitCoach web client: sessions against the hosted auth
//! service, the fitness questionnaire, and AI-generated recommendations.

use fitcoach::{
    config::{BackendMode, Config},
    db::{Backend, MemoryBackend, SupabaseBackend},
    services::{LlmProvider, OpenAiCompatibleProvider},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting FitCoach API");

    let backend: Arc<dyn Backend> = match config.backend_mode {
        BackendMode::Hosted => {
            tracing::info!(url = %config.backend_url, "Using hosted backend");
            Arc::new(SupabaseBackend::new(
                &config.backend_url,
                &config.backend_anon_key,
            ))
        }
        BackendMode::Memory => {
            tracing::warn!("Using in-memory backend; nothing survives a restart");
            Arc::new(MemoryBackend::default())
        }
    };

    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::from_config(&config)?);
    tracing::info!(
        model = %config.llm_model,
        timeout_secs = config.generation_timeout.as_secs(),
        "LLM provider initialized"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), backend, llm));

    // Build router
    let app = fitcoach::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["fitcoach=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry().with(filter).with(format).init();
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// How the hosted backend is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Hosted auth + REST backend.
    Hosted,
    /// In-process backend for local development.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Hosted backend base URL
    pub backend_url: String,
    /// Backend selection
    pub backend_mode: BackendMode,
    /// Base URL of the OpenAI-compatible LLM API
    pub llm_base_url: String,
    /// Model used for content generation
    pub llm_model: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Deadline for a single content generation
    pub generation_timeout: Duration,
    /// How long a verified session is trusted without asking the backend again
    pub session_stale_after: Duration,
    /// Maximum entries in the profile query cache
    pub cache_max_entries: usize,
    /// Maximum age of a profile query cache entry
    pub cache_ttl: Duration,
    /// Maximum age of cached supplement recommendations
    pub supplement_cache_ttl: Duration,
    /// Accounts whose session, draft and panels are kept in memory at once
    pub max_tracked_accounts: usize,
    /// Per-account state unused for this long is dropped
    pub session_idle_timeout: Duration,

    // --- Secrets ---
    /// Public (anon) key sent to the hosted backend
    pub backend_anon_key: String,
    /// LLM API key
    pub llm_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

/// Default LLM endpoint.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
/// Default LLM model.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
/// Generation deadline in seconds.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 25;
/// Session staleness window in seconds.
pub const DEFAULT_SESSION_STALE_SECS: u64 = 5 * 60;
/// Accounts tracked in memory.
pub const DEFAULT_MAX_TRACKED_ACCOUNTS: usize = 10_000;
/// Idle per-account state lifetime in days.
pub const DEFAULT_SESSION_IDLE_DAYS: u64 = 30;
/// Supplement cache lifetime in days.
pub const DEFAULT_SUPPLEMENT_CACHE_TTL_DAYS: u64 = 30;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

impl Config {
    /// Config for tests: in-memory backend, short deadlines left at defaults.
    pub fn test_default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            backend_mode: BackendMode::Memory,
            llm_base_url: "http://localhost:11434/v1".to_string(),
            llm_model: "test-model".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
            session_stale_after: Duration::from_secs(DEFAULT_SESSION_STALE_SECS),
            cache_max_entries: 100,
            cache_ttl: Duration::from_secs(600),
            supplement_cache_ttl: Duration::from_secs(
                DEFAULT_SUPPLEMENT_CACHE_TTL_DAYS * SECS_PER_DAY,
            ),
            max_tracked_accounts: 100,
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_DAYS * SECS_PER_DAY),
            backend_anon_key: "test_anon_key".to_string(),
            llm_api_key: "test_llm_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let backend_mode = match env::var("BACKEND_MODE").as_deref() {
            Ok("memory") => BackendMode::Memory,
            Ok("hosted") | Err(_) => BackendMode::Hosted,
            Ok(other) => return Err(ConfigError::Invalid("BACKEND_MODE", other.to_string())),
        };

        let backend_url = match backend_mode {
            BackendMode::Hosted => env::var("BACKEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_URL"))?,
            BackendMode::Memory => env::var("BACKEND_URL").unwrap_or_default(),
        };

        let backend_anon_key = match backend_mode {
            BackendMode::Hosted => env::var("BACKEND_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_ANON_KEY"))?,
            BackendMode::Memory => env::var("BACKEND_ANON_KEY").unwrap_or_default(),
        };

        Ok(Self {
            backend_url,
            backend_mode,
            llm_base_url: env::var("LLM_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            generation_timeout: Duration::from_secs(parse_or(
                "GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )),
            session_stale_after: Duration::from_secs(parse_or(
                "SESSION_STALE_SECS",
                DEFAULT_SESSION_STALE_SECS,
            )),
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", 1000),
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 600)),
            supplement_cache_ttl: days(
                "SUPPLEMENT_CACHE_TTL_DAYS",
                parse_or("SUPPLEMENT_CACHE_TTL_DAYS", DEFAULT_SUPPLEMENT_CACHE_TTL_DAYS),
            )?,
            max_tracked_accounts: parse_or("MAX_TRACKED_ACCOUNTS", DEFAULT_MAX_TRACKED_ACCOUNTS),
            session_idle_timeout: days(
                "SESSION_IDLE_DAYS",
                parse_or("SESSION_IDLE_DAYS", DEFAULT_SESSION_IDLE_DAYS),
            )?,

            llm_api_key: env::var("LLM_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("LLM_API_KEY"))?,
            backend_anon_key,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn days(name: &'static str, count: u64) -> Result<Duration, ConfigError> {
    count
        .checked_mul(SECS_PER_DAY)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid(name, count.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("BACKEND_MODE", "hosted");
        env::set_var("BACKEND_URL", "https://project.example.co/");
        env::set_var("BACKEND_ANON_KEY", "anon");
        env::set_var("LLM_API_KEY", "sk-test");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.backend_url, "https://project.example.co");
        assert_eq!(config.backend_mode, BackendMode::Hosted);
        assert_eq!(config.llm_api_key, "sk-test");
        assert_eq!(config.port, 8080);
        assert_eq!(config.generation_timeout, Duration::from_secs(25));
        assert_eq!(config.session_stale_after, Duration::from_secs(300));
        assert_eq!(config.supplement_cache_ttl, Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn test_day_counts_that_overflow_are_rejected() {
        assert_eq!(
            days("SESSION_IDLE_DAYS", 2).unwrap(),
            Duration::from_secs(2 * 86_400)
        );
        assert!(matches!(
            days("SUPPLEMENT_CACHE_TTL_DAYS", u64::MAX),
            Err(ConfigError::Invalid("SUPPLEMENT_CACHE_TTL_DAYS", _))
        ));
    }
}

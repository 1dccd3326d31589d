// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted backend layer (auth + tables).

pub mod backend;
pub mod memory;

pub use backend::{Backend, SupabaseBackend};
pub use memory::MemoryBackend;

/// Table names as constants.
pub mod tables {
    /// One questionnaire row per account
    pub const USER_PROFILES: &str = "user_profiles";
    /// Display name per account
    pub const ACCOUNT_NAMES: &str = "account_names";
}

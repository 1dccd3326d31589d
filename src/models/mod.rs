// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod content;
pub mod profile;
pub mod user;

pub use content::{ContentKind, FlexibilityPlan, GeneratedContent, NutritionPlan, SupplementList};
pub use profile::{ProfileRow, UserProfile};
pub use user::{AccountContext, AuthSession, BackendUser, SignUpResult};

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cache;
pub mod dashboard;
pub mod generation;
pub mod llm;
pub mod page_state;
pub mod profile;
pub mod prompts;
pub mod session;
pub mod wizard;

pub use cache::QueryCache;
pub use dashboard::{DashboardOverview, DashboardService, PanelState, PanelView};
pub use generation::GenerationService;
pub use llm::{ChatPrompt, LlmProvider, OpenAiCompatibleProvider};
pub use page_state::{LoadPolicy, PageEvent, PageState};
pub use profile::ProfileService;
pub use session::{SessionService, SessionStatus};
pub use wizard::{StepInput, Wizard, WizardCompletion, WizardStep, WizardStore, WizardView};

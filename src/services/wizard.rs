// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Five-step questionnaire wizard over an in-memory draft.
//!
//! Moving between steps only changes which step is shown. Each step edits its
//! own section of the draft; nothing is checked across steps. The draft lives
//! in process memory until the last step saves it.

use crate::error::AppError;
use crate::models::profile::{
    CardioMetrics, DietaryRestrictions, FlexibilityMetrics, ForceMetrics, HealthConditions,
    MetabolicMetrics, Objectives,
};
use crate::models::{AccountContext, UserProfile};
use crate::services::cache::QueryCache;
use crate::services::profile::ProfileService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

/// Where the client goes once the questionnaire is saved.
pub const COMPLETION_REDIRECT: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    Identity,
    StrengthFlexibility,
    MetabolicCardio,
    Objectives,
    RestrictionsHealth,
}

impl WizardStep {
    pub const COUNT: u8 = 5;

    const ORDER: [WizardStep; 5] = [
        WizardStep::Identity,
        WizardStep::StrengthFlexibility,
        WizardStep::MetabolicCardio,
        WizardStep::Objectives,
        WizardStep::RestrictionsHealth,
    ];

    /// 1-based position.
    pub fn number(&self) -> u8 {
        Self::ORDER
            .iter()
            .position(|s| s == self)
            .map(|i| i as u8 + 1)
            .unwrap_or(1)
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::ORDER.get(self.number() as usize).copied()
    }

    pub fn previous(&self) -> Option<WizardStep> {
        (self.number() as usize)
            .checked_sub(2)
            .and_then(|i| Self::ORDER.get(i).copied())
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Identity => "Informations personnelles",
            WizardStep::StrengthFlexibility => "Force et souplesse",
            WizardStep::MetabolicCardio => "Métabolisme et cardio",
            WizardStep::Objectives => "Objectifs",
            WizardStep::RestrictionsHealth => "Alimentation et santé",
        }
    }
}

// ─── Step inputs ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IdentityInput {
    #[validate(custom(function = "validate_sex"))]
    pub sex: String,
    #[validate(range(max = 120))]
    pub age: u32,
    #[validate(range(min = 0.0, max = 400.0))]
    #[serde(alias = "poids")]
    pub weight: f64,
    #[validate(range(min = 0.0, max = 260.0))]
    pub height: f64,
}

fn validate_sex(sex: &str) -> Result<(), validator::ValidationError> {
    match sex {
        "homme" | "femme" | "" => Ok(()),
        _ => Err(validator::ValidationError::new("sex")),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthFlexibilityInput {
    #[serde(default)]
    pub force: ForceMetrics,
    #[serde(default)]
    pub flexibility: FlexibilityMetrics,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetabolicCardioInput {
    #[serde(default)]
    pub metabolic: MetabolicMetrics,
    #[serde(default)]
    pub cardio: CardioMetrics,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionsHealthInput {
    #[serde(default)]
    pub dietary_restrictions: DietaryRestrictions,
    #[serde(default)]
    pub health_conditions: HealthConditions,
}

/// The answers of one step: `{"step": "identity", "data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", content = "data", rename_all = "camelCase")]
pub enum StepInput {
    Identity(IdentityInput),
    StrengthFlexibility(StrengthFlexibilityInput),
    MetabolicCardio(MetabolicCardioInput),
    Objectives(Objectives),
    RestrictionsHealth(RestrictionsHealthInput),
}

impl StepInput {
    pub fn step(&self) -> WizardStep {
        match self {
            StepInput::Identity(_) => WizardStep::Identity,
            StepInput::StrengthFlexibility(_) => WizardStep::StrengthFlexibility,
            StepInput::MetabolicCardio(_) => WizardStep::MetabolicCardio,
            StepInput::Objectives(_) => WizardStep::Objectives,
            StepInput::RestrictionsHealth(_) => WizardStep::RestrictionsHealth,
        }
    }
}

// ─── Wizard ──────────────────────────────────────────────────

/// One user's progress through the questionnaire.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    draft: UserProfile,
}

impl Wizard {
    /// Start at step 1 with `draft` pre-filled (usually the saved profile).
    pub fn new(draft: UserProfile) -> Self {
        Self {
            step: WizardStep::Identity,
            draft,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &UserProfile {
        &self.draft
    }

    /// Go forward; stays on the last step.
    pub fn next(&mut self) -> WizardStep {
        if let Some(step) = self.step.next() {
            self.step = step;
        }
        self.step
    }

    /// Go back; stays on the first step.
    pub fn previous(&mut self) -> WizardStep {
        if let Some(step) = self.step.previous() {
            self.step = step;
        }
        self.step
    }

    /// Overwrite the current step's section of the draft.
    pub fn apply(&mut self, input: StepInput) -> Result<(), AppError> {
        if input.step() != self.step {
            return Err(AppError::BadRequest(format!(
                "Answers for step {} sent while on step {}",
                input.step().number(),
                self.step.number()
            )));
        }

        match input {
            StepInput::Identity(identity) => {
                identity
                    .validate()
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                self.draft.sex = identity.sex;
                self.draft.age = identity.age;
                self.draft.weight = identity.weight;
                self.draft.height = identity.height;
            }
            StepInput::StrengthFlexibility(input) => {
                self.draft.force = input.force;
                self.draft.flexibility = input.flexibility;
            }
            StepInput::MetabolicCardio(input) => {
                self.draft.metabolic = input.metabolic;
                self.draft.cardio = input.cardio;
            }
            StepInput::Objectives(objectives) => {
                self.draft.objectives = objectives;
            }
            StepInput::RestrictionsHealth(input) => {
                self.draft.dietary_restrictions = input.dietary_restrictions;
                self.draft.health_conditions = input.health_conditions;
            }
        }
        Ok(())
    }

    /// The draft to save; only available on the last step.
    pub fn finish(&self) -> Result<&UserProfile, AppError> {
        if self.step.next().is_some() {
            return Err(AppError::BadRequest(format!(
                "The questionnaire can only be submitted from step {}",
                WizardStep::COUNT
            )));
        }
        Ok(&self.draft)
    }
}

/// Serialized wizard state returned to the client.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step: WizardStep,
    pub step_number: u8,
    pub total_steps: u8,
    pub title: String,
    pub is_first: bool,
    pub is_last: bool,
    pub draft: UserProfile,
}

impl From<&Wizard> for WizardView {
    fn from(wizard: &Wizard) -> Self {
        Self {
            step: wizard.step,
            step_number: wizard.step.number(),
            total_steps: WizardStep::COUNT,
            title: wizard.step.title().to_string(),
            is_first: wizard.step.previous().is_none(),
            is_last: wizard.step.next().is_none(),
            draft: wizard.draft.clone(),
        }
    }
}

/// Outcome of submitting the last step.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct WizardCompletion {
    pub profile: UserProfile,
    pub redirect_to: String,
}

// ─── Store ───────────────────────────────────────────────────

/// Drafts untouched for this long are dropped.
pub const DRAFT_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-account drafts held in memory, bounded in count and idle time.
#[derive(Clone)]
pub struct WizardStore {
    drafts: Arc<QueryCache<Uuid, Wizard>>,
    profiles: ProfileService,
}

impl WizardStore {
    pub fn new(profiles: ProfileService, max_drafts: usize, idle_timeout: Duration) -> Self {
        Self {
            drafts: Arc::new(QueryCache::new(max_drafts, idle_timeout)),
            profiles,
        }
    }

    /// Current wizard for the account, seeded from the saved profile.
    pub async fn current(&self, ctx: &AccountContext) -> Result<WizardView, AppError> {
        Ok(WizardView::from(&self.draft(ctx).await?))
    }

    /// Apply a change to the account's wizard, starting one if needed.
    pub async fn update<F>(&self, ctx: &AccountContext, change: F) -> Result<WizardView, AppError>
    where
        F: FnOnce(&mut Wizard) -> Result<(), AppError>,
    {
        self.draft(ctx).await?;

        self.drafts
            .update(&ctx.account_id, |wizard| -> Result<WizardView, AppError> {
                change(wizard)?;
                Ok(WizardView::from(&*wizard))
            })
            .await
            .unwrap_or_else(|| Err(AppError::NotFound("Wizard draft".to_string())))
    }

    /// Save the draft from the last step and drop it.
    pub async fn finish(&self, ctx: &AccountContext) -> Result<WizardCompletion, AppError> {
        let wizard = self.draft(ctx).await?;
        let draft = wizard.finish()?;

        let profile = self.profiles.save_user_data(Some(ctx), Some(draft)).await?;
        self.drafts.invalidate(&ctx.account_id).await;

        tracing::info!(account_id = %ctx.account_id, "Questionnaire completed");
        Ok(WizardCompletion {
            profile,
            redirect_to: COMPLETION_REDIRECT.to_string(),
        })
    }

    /// Throw away unsaved edits.
    pub async fn discard(&self, account_id: Uuid) {
        self.drafts.invalidate(&account_id).await;
    }

    async fn draft(&self, ctx: &AccountContext) -> Result<Wizard, AppError> {
        if let Some(wizard) = self.drafts.get(&ctx.account_id).await {
            return Ok(wizard);
        }

        let saved = self.profiles.load_user_data(Some(ctx)).await?;
        Ok(self
            .drafts
            .get_or_insert(ctx.account_id, Wizard::new(saved))
            .await)
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Questionnaire profile: nested API shape and flat storage row.
//!
//! The API (and the wizard) work on [`UserProfile`], grouped by theme and
//! serialized in camelCase. The hosted table stores one flat snake_case
//! [`ProfileRow`] per account where every questionnaire column is nullable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Strength test results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct ForceMetrics {
    pub push_ups: u32,
    pub squats: u32,
    pub plank_seconds: u32,
}

/// Flexibility test results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct FlexibilityMetrics {
    pub sit_and_reach_cm: f64,
    pub shoulder_mobility_cm: f64,
}

/// Body-composition and metabolic measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct MetabolicMetrics {
    pub body_fat_percent: f64,
    pub waist_cm: f64,
    pub resting_heart_rate: u32,
}

/// Cardio test results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct CardioMetrics {
    pub vo2_max: f64,
    pub cooper_distance_m: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct Objectives {
    pub weight_loss: bool,
    pub muscle_gain: bool,
    pub endurance: bool,
    pub flexibility: bool,
    pub general_health: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct DietaryRestrictions {
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub lactose_free: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct HealthConditions {
    pub diabetes: bool,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub joint_problems: bool,
    pub asthma: bool,
    /// Free-text note for anything the flags don't cover
    pub notes: String,
}

/// The user's questionnaire, as the wizard and dashboard see it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// "homme", "femme" or empty
    pub sex: String,
    pub age: u32,
    /// Body weight (kg)
    #[serde(alias = "poids")]
    pub weight: f64,
    /// Height (cm)
    pub height: f64,
    pub force: ForceMetrics,
    pub flexibility: FlexibilityMetrics,
    pub metabolic: MetabolicMetrics,
    pub cardio: CardioMetrics,
    pub objectives: Objectives,
    pub dietary_restrictions: DietaryRestrictions,
    pub health_conditions: HealthConditions,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// True when nothing was ever filled in.
    pub fn is_blank(&self) -> bool {
        let mut this = self.clone();
        this.updated_at = None;
        this == UserProfile::default()
    }

    /// Stable digest of the questionnaire answers (timestamps excluded).
    ///
    /// Generated content is keyed by this so a saved change invalidates it.
    pub fn fingerprint(&self) -> String {
        let mut this = self.clone();
        this.updated_at = None;
        // Struct field order is fixed, so the serialization is deterministic.
        let canonical = serde_json::to_vec(&this).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }
}

/// Flat row in the hosted `user_profiles` table.
///
/// Every questionnaire column is nullable; a missing value reads back as
/// zero, `false` or an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,

    // ─── Force ───────────────────────────────────────────────────
    #[serde(default)]
    pub push_ups: Option<u32>,
    #[serde(default)]
    pub squats: Option<u32>,
    #[serde(default)]
    pub plank_seconds: Option<u32>,

    // ─── Flexibility ─────────────────────────────────────────────
    #[serde(default)]
    pub sit_and_reach_cm: Option<f64>,
    #[serde(default)]
    pub shoulder_mobility_cm: Option<f64>,

    // ─── Metabolic ───────────────────────────────────────────────
    #[serde(default)]
    pub body_fat_percent: Option<f64>,
    #[serde(default)]
    pub waist_cm: Option<f64>,
    #[serde(default)]
    pub resting_heart_rate: Option<u32>,

    // ─── Cardio ──────────────────────────────────────────────────
    #[serde(default)]
    pub vo2_max: Option<f64>,
    #[serde(default)]
    pub cooper_distance_m: Option<u32>,

    // ─── Objectives ──────────────────────────────────────────────
    #[serde(default)]
    pub objective_weight_loss: Option<bool>,
    #[serde(default)]
    pub objective_muscle_gain: Option<bool>,
    #[serde(default)]
    pub objective_endurance: Option<bool>,
    #[serde(default)]
    pub objective_flexibility: Option<bool>,
    #[serde(default)]
    pub objective_general_health: Option<bool>,

    // ─── Dietary restrictions ────────────────────────────────────
    #[serde(default)]
    pub diet_vegetarian: Option<bool>,
    #[serde(default)]
    pub diet_vegan: Option<bool>,
    #[serde(default)]
    pub diet_gluten_free: Option<bool>,
    #[serde(default)]
    pub diet_lactose_free: Option<bool>,

    // ─── Health conditions ───────────────────────────────────────
    #[serde(default)]
    pub health_diabetes: Option<bool>,
    #[serde(default)]
    pub health_hypertension: Option<bool>,
    #[serde(default)]
    pub health_heart_disease: Option<bool>,
    #[serde(default)]
    pub health_joint_problems: Option<bool>,
    #[serde(default)]
    pub health_asthma: Option<bool>,
    #[serde(default)]
    pub health_notes: Option<String>,

    // ─── Metadata ────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileRow {
    /// Flatten a profile into a row owned by `user_id`.
    pub fn from_profile(user_id: Uuid, profile: &UserProfile) -> Self {
        Self {
            id: None,
            user_id,
            sex: Some(profile.sex.clone()),
            age: Some(profile.age),
            weight: Some(profile.weight),
            height: Some(profile.height),
            push_ups: Some(profile.force.push_ups),
            squats: Some(profile.force.squats),
            plank_seconds: Some(profile.force.plank_seconds),
            sit_and_reach_cm: Some(profile.flexibility.sit_and_reach_cm),
            shoulder_mobility_cm: Some(profile.flexibility.shoulder_mobility_cm),
            body_fat_percent: Some(profile.metabolic.body_fat_percent),
            waist_cm: Some(profile.metabolic.waist_cm),
            resting_heart_rate: Some(profile.metabolic.resting_heart_rate),
            vo2_max: Some(profile.cardio.vo2_max),
            cooper_distance_m: Some(profile.cardio.cooper_distance_m),
            objective_weight_loss: Some(profile.objectives.weight_loss),
            objective_muscle_gain: Some(profile.objectives.muscle_gain),
            objective_endurance: Some(profile.objectives.endurance),
            objective_flexibility: Some(profile.objectives.flexibility),
            objective_general_health: Some(profile.objectives.general_health),
            diet_vegetarian: Some(profile.dietary_restrictions.vegetarian),
            diet_vegan: Some(profile.dietary_restrictions.vegan),
            diet_gluten_free: Some(profile.dietary_restrictions.gluten_free),
            diet_lactose_free: Some(profile.dietary_restrictions.lactose_free),
            health_diabetes: Some(profile.health_conditions.diabetes),
            health_hypertension: Some(profile.health_conditions.hypertension),
            health_heart_disease: Some(profile.health_conditions.heart_disease),
            health_joint_problems: Some(profile.health_conditions.joint_problems),
            health_asthma: Some(profile.health_conditions.asthma),
            health_notes: Some(profile.health_conditions.notes.clone()),
            created_at: None,
            updated_at: profile.updated_at,
        }
    }
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            sex: row.sex.unwrap_or_default(),
            age: row.age.unwrap_or_default(),
            weight: row.weight.unwrap_or_default(),
            height: row.height.unwrap_or_default(),
            force: ForceMetrics {
                push_ups: row.push_ups.unwrap_or_default(),
                squats: row.squats.unwrap_or_default(),
                plank_seconds: row.plank_seconds.unwrap_or_default(),
            },
            flexibility: FlexibilityMetrics {
                sit_and_reach_cm: row.sit_and_reach_cm.unwrap_or_default(),
                shoulder_mobility_cm: row.shoulder_mobility_cm.unwrap_or_default(),
            },
            metabolic: MetabolicMetrics {
                body_fat_percent: row.body_fat_percent.unwrap_or_default(),
                waist_cm: row.waist_cm.unwrap_or_default(),
                resting_heart_rate: row.resting_heart_rate.unwrap_or_default(),
            },
            cardio: CardioMetrics {
                vo2_max: row.vo2_max.unwrap_or_default(),
                cooper_distance_m: row.cooper_distance_m.unwrap_or_default(),
            },
            objectives: Objectives {
                weight_loss: row.objective_weight_loss.unwrap_or_default(),
                muscle_gain: row.objective_muscle_gain.unwrap_or_default(),
                endurance: row.objective_endurance.unwrap_or_default(),
                flexibility: row.objective_flexibility.unwrap_or_default(),
                general_health: row.objective_general_health.unwrap_or_default(),
            },
            dietary_restrictions: DietaryRestrictions {
                vegetarian: row.diet_vegetarian.unwrap_or_default(),
                vegan: row.diet_vegan.unwrap_or_default(),
                gluten_free: row.diet_gluten_free.unwrap_or_default(),
                lactose_free: row.diet_lactose_free.unwrap_or_default(),
            },
            health_conditions: HealthConditions {
                diabetes: row.health_diabetes.unwrap_or_default(),
                hypertension: row.health_hypertension.unwrap_or_default(),
                heart_disease: row.health_heart_disease.unwrap_or_default(),
                joint_problems: row.health_joint_problems.unwrap_or_default(),
                asthma: row.health_asthma.unwrap_or_default(),
                notes: row.health_notes.unwrap_or_default(),
            },
            updated_at: row.updated_at.or(row.created_at),
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt construction and JSON extraction for content generation.

use crate::error::AppError;
use crate::models::{ContentKind, UserProfile};
use crate::services::llm::ChatPrompt;
use serde_json::Value;

const SYSTEM_PROMPT: &str = "Tu es un coach sportif et nutritionniste diplômé. \
Tu réponds uniquement avec un objet JSON valide, sans texte autour, \
en respectant exactement le schéma demandé.";

const NUTRITION_SCHEMA: &str = r#"{
  "dailyCalories": number,
  "macros": { "proteinGrams": number, "carbsGrams": number, "fatGrams": number },
  "meals": [ { "name": string, "time": "HH:MM", "foods": [string], "calories": number } ],
  "hydrationLiters": number,
  "tips": [string]
}"#;

const SUPPLEMENTS_SCHEMA: &str = r#"{
  "supplements": [ { "name": string, "dosage": string, "timing": string, "benefits": string, "precautions": string } ],
  "generalAdvice": string
}"#;

const FLEXIBILITY_SCHEMA: &str = r#"{
  "sessionsPerWeek": number,
  "sessionDurationMinutes": number,
  "exercises": [ { "name": string, "targetArea": string, "durationSeconds": number, "repetitions": number, "instructions": string } ],
  "warnings": [string]
}"#;

/// Build the prompt asking for one document of `kind`.
pub fn build_prompt(kind: ContentKind, profile: &UserProfile) -> ChatPrompt {
    let (task, schema) = match kind {
        ContentKind::Nutrition => (
            "Établis un plan nutritionnel journalier adapté à ce profil.",
            NUTRITION_SCHEMA,
        ),
        ContentKind::Supplements => (
            "Recommande des compléments alimentaires pertinents et sûrs pour ce profil.",
            SUPPLEMENTS_SCHEMA,
        ),
        ContentKind::Flexibility => (
            "Propose un programme d'étirements et de mobilité adapté à ce profil.",
            FLEXIBILITY_SCHEMA,
        ),
    };

    ChatPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!(
            "{task}\n\nProfil :\n{profile}\n\nRéponds avec ce schéma JSON :\n{schema}",
            task = task,
            profile = describe_profile(profile),
            schema = schema
        ),
    }
}

/// Human-readable profile summary used inside prompts.
pub fn describe_profile(p: &UserProfile) -> String {
    let sex = match p.sex.as_str() {
        "" => "non précisé",
        s => s,
    };

    let mut lines = vec![
        format!("- Sexe : {}", sex),
        format!("- Âge : {} ans", p.age),
        format!("- Poids : {} kg, taille : {} cm", p.weight, p.height),
        format!(
            "- Force : {} pompes, {} squats, gainage {} s",
            p.force.push_ups, p.force.squats, p.force.plank_seconds
        ),
        format!(
            "- Souplesse : flexion avant {} cm, mobilité d'épaule {} cm",
            p.flexibility.sit_and_reach_cm, p.flexibility.shoulder_mobility_cm
        ),
        format!(
            "- Métabolisme : {} % de masse grasse, tour de taille {} cm, FC repos {} bpm",
            p.metabolic.body_fat_percent, p.metabolic.waist_cm, p.metabolic.resting_heart_rate
        ),
        format!(
            "- Cardio : VO2max {}, test de Cooper {} m",
            p.cardio.vo2_max, p.cardio.cooper_distance_m
        ),
    ];

    let objectives = flagged(&[
        (p.objectives.weight_loss, "perte de poids"),
        (p.objectives.muscle_gain, "prise de muscle"),
        (p.objectives.endurance, "endurance"),
        (p.objectives.flexibility, "souplesse"),
        (p.objectives.general_health, "santé générale"),
    ]);
    lines.push(format!("- Objectifs : {}", objectives));

    let diet = flagged(&[
        (p.dietary_restrictions.vegetarian, "végétarien"),
        (p.dietary_restrictions.vegan, "végan"),
        (p.dietary_restrictions.gluten_free, "sans gluten"),
        (p.dietary_restrictions.lactose_free, "sans lactose"),
    ]);
    lines.push(format!("- Restrictions alimentaires : {}", diet));

    let health = flagged(&[
        (p.health_conditions.diabetes, "diabète"),
        (p.health_conditions.hypertension, "hypertension"),
        (p.health_conditions.heart_disease, "maladie cardiaque"),
        (p.health_conditions.joint_problems, "problèmes articulaires"),
        (p.health_conditions.asthma, "asthme"),
    ]);
    lines.push(format!("- Conditions de santé : {}", health));

    let notes = p.health_conditions.notes.trim();
    if !notes.is_empty() {
        lines.push(format!("- Remarques : {}", notes));
    }

    lines.join("\n")
}

fn flagged(flags: &[(bool, &str)]) -> String {
    let set: Vec<&str> = flags
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, label)| *label)
        .collect();
    if set.is_empty() {
        "aucun(e)".to_string()
    } else {
        set.join(", ")
    }
}

/// Pull the JSON object out of an LLM reply.
///
/// Handles Markdown code fences and prose before or after the object.
pub fn extract_json(text: &str) -> Result<Value, AppError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| AppError::Generation(format!("Malformed JSON in LLM reply: {}", e))),
        _ => Err(AppError::Generation(
            "LLM reply contains no JSON object".to_string(),
        )),
    }
}

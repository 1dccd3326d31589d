// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI-generated recommendation documents.
//!
//! The LLM is asked for a fixed JSON shape but nothing guarantees it follows
//! it. Each document is therefore rebuilt field by field from the raw JSON:
//! a field that is missing or has the wrong type takes the value of the same
//! field in the document's default, and every other field is kept as sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Which recommendation document is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Nutrition,
    Supplements,
    Flexibility,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Nutrition,
        ContentKind::Supplements,
        ContentKind::Flexibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Nutrition => "nutrition",
            ContentKind::Supplements => "supplements",
            ContentKind::Flexibility => "flexibility",
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nutrition" => Ok(ContentKind::Nutrition),
            "supplements" => Ok(ContentKind::Supplements),
            "flexibility" => Ok(ContentKind::Flexibility),
            other => Err(crate::error::AppError::BadRequest(format!(
                "Unknown content type '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Nutrition ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Macros {
    pub protein_grams: u32,
    pub carbs_grams: u32,
    pub fat_grams: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub name: String,
    pub time: String,
    pub foods: Vec<String>,
    pub calories: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NutritionPlan {
    pub daily_calories: u32,
    pub macros: Macros,
    pub meals: Vec<Meal>,
    pub hydration_liters: f64,
    pub tips: Vec<String>,
}

impl Default for NutritionPlan {
    fn default() -> Self {
        Self {
            daily_calories: 2000,
            macros: Macros {
                protein_grams: 120,
                carbs_grams: 230,
                fat_grams: 70,
            },
            meals: vec![
                meal(
                    "Petit-déjeuner",
                    "07:30",
                    &["Flocons d'avoine", "Fruits rouges", "Yaourt nature"],
                    450,
                ),
                meal(
                    "Déjeuner",
                    "12:30",
                    &["Riz complet", "Poulet grillé", "Légumes verts"],
                    650,
                ),
                meal("Collation", "16:30", &["Poignée d'amandes", "Pomme"], 250),
                meal("Dîner", "19:30", &["Saumon", "Patate douce", "Salade"], 650),
            ],
            hydration_liters: 2.0,
            tips: vec![
                "Répartissez vos protéines sur chaque repas.".to_string(),
                "Privilégiez les aliments peu transformés.".to_string(),
                "Buvez régulièrement tout au long de la journée.".to_string(),
            ],
        }
    }
}

fn meal(name: &str, time: &str, foods: &[&str], calories: u32) -> Meal {
    Meal {
        name: name.to_string(),
        time: time.to_string(),
        foods: foods.iter().map(|f| f.to_string()).collect(),
        calories,
    }
}

impl NutritionPlan {
    pub fn from_llm_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            return defaults;
        };

        let macros = match obj.get("macros").and_then(Value::as_object) {
            Some(m) => Macros {
                protein_grams: field_u32(m, "proteinGrams", defaults.macros.protein_grams),
                carbs_grams: field_u32(m, "carbsGrams", defaults.macros.carbs_grams),
                fat_grams: field_u32(m, "fatGrams", defaults.macros.fat_grams),
            },
            None => defaults.macros.clone(),
        };

        let meals = field_list(obj, "meals", defaults.meals, |item| {
            let name = non_empty_str(item.get("name"))?;
            Some(Meal {
                name,
                time: field_string(item, "time", ""),
                foods: string_items(item.get("foods")).unwrap_or_default(),
                calories: field_u32(item, "calories", 0),
            })
        });

        Self {
            daily_calories: field_u32(obj, "dailyCalories", defaults.daily_calories),
            macros,
            meals,
            hydration_liters: field_f64(obj, "hydrationLiters", defaults.hydration_liters),
            tips: field_string_list(obj, "tips", defaults.tips),
        }
    }
}

// ─── Supplements ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Supplement {
    pub name: String,
    pub dosage: String,
    pub timing: String,
    pub benefits: String,
    pub precautions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SupplementList {
    pub supplements: Vec<Supplement>,
    pub general_advice: String,
}

impl Default for SupplementList {
    fn default() -> Self {
        Self {
            supplements: vec![
                Supplement {
                    name: "Vitamine D3".to_string(),
                    dosage: "1000 UI".to_string(),
                    timing: "Le matin, pendant un repas".to_string(),
                    benefits: "Santé osseuse et immunité".to_string(),
                    precautions: "Faire doser avant une supplémentation prolongée".to_string(),
                },
                Supplement {
                    name: "Oméga-3".to_string(),
                    dosage: "1 g".to_string(),
                    timing: "Pendant un repas".to_string(),
                    benefits: "Santé cardiovasculaire et récupération".to_string(),
                    precautions: "Avis médical si traitement anticoagulant".to_string(),
                },
            ],
            general_advice: "Les compléments ne remplacent pas une alimentation variée. \
                             Demandez l'avis d'un professionnel de santé."
                .to_string(),
        }
    }
}

impl SupplementList {
    pub fn from_llm_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            return defaults;
        };

        let supplements = field_list(obj, "supplements", defaults.supplements, |item| {
            let name = non_empty_str(item.get("name"))?;
            Some(Supplement {
                name,
                dosage: field_string(item, "dosage", ""),
                timing: field_string(item, "timing", ""),
                benefits: field_string(item, "benefits", ""),
                precautions: field_string(item, "precautions", ""),
            })
        });

        Self {
            supplements,
            general_advice: field_string(obj, "generalAdvice", &defaults.general_advice),
        }
    }
}

// ─── Flexibility ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct StretchExercise {
    pub name: String,
    pub target_area: String,
    pub duration_seconds: u32,
    pub repetitions: u32,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct FlexibilityPlan {
    pub sessions_per_week: u32,
    pub session_duration_minutes: u32,
    pub exercises: Vec<StretchExercise>,
    pub warnings: Vec<String>,
}

impl Default for FlexibilityPlan {
    fn default() -> Self {
        Self {
            sessions_per_week: 3,
            session_duration_minutes: 20,
            exercises: vec![
                stretch(
                    "Étirement des ischio-jambiers",
                    "Arrière des cuisses",
                    30,
                    3,
                    "Jambe tendue sur un support, penchez le buste sans arrondir le dos.",
                ),
                stretch(
                    "Fente basse",
                    "Fléchisseurs de hanche",
                    30,
                    3,
                    "Genou arrière au sol, avancez le bassin doucement.",
                ),
                stretch(
                    "Ouverture thoracique",
                    "Épaules et haut du dos",
                    20,
                    5,
                    "Allongé sur le côté, ouvrez le bras vers l'arrière en expirant.",
                ),
                stretch(
                    "Chat-vache",
                    "Colonne vertébrale",
                    40,
                    2,
                    "À quatre pattes, alternez dos rond et dos creux lentement.",
                ),
            ],
            warnings: vec![
                "Ne forcez jamais jusqu'à la douleur.".to_string(),
                "Échauffez-vous 5 minutes avant les étirements.".to_string(),
            ],
        }
    }
}

fn stretch(name: &str, area: &str, secs: u32, reps: u32, how: &str) -> StretchExercise {
    StretchExercise {
        name: name.to_string(),
        target_area: area.to_string(),
        duration_seconds: secs,
        repetitions: reps,
        instructions: how.to_string(),
    }
}

impl FlexibilityPlan {
    pub fn from_llm_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            return defaults;
        };

        let exercises = field_list(obj, "exercises", defaults.exercises, |item| {
            let name = non_empty_str(item.get("name"))?;
            Some(StretchExercise {
                name,
                target_area: field_string(item, "targetArea", ""),
                duration_seconds: field_u32(item, "durationSeconds", 30),
                repetitions: field_u32(item, "repetitions", 1),
                instructions: field_string(item, "instructions", ""),
            })
        });

        Self {
            sessions_per_week: field_u32(obj, "sessionsPerWeek", defaults.sessions_per_week),
            session_duration_minutes: field_u32(
                obj,
                "sessionDurationMinutes",
                defaults.session_duration_minutes,
            ),
            exercises,
            warnings: field_string_list(obj, "warnings", defaults.warnings),
        }
    }
}

// ─── Any document ────────────────────────────────────────────

/// One generated document, serialized as the bare document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedContent {
    Nutrition(NutritionPlan),
    Supplements(SupplementList),
    Flexibility(FlexibilityPlan),
}

impl GeneratedContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            GeneratedContent::Nutrition(_) => ContentKind::Nutrition,
            GeneratedContent::Supplements(_) => ContentKind::Supplements,
            GeneratedContent::Flexibility(_) => ContentKind::Flexibility,
        }
    }

    /// The hardcoded document used when generation is impossible.
    pub fn default_for(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Nutrition => GeneratedContent::Nutrition(NutritionPlan::default()),
            ContentKind::Supplements => GeneratedContent::Supplements(SupplementList::default()),
            ContentKind::Flexibility => GeneratedContent::Flexibility(FlexibilityPlan::default()),
        }
    }

    /// Rebuild a document of `kind` from raw LLM JSON with per-field fallbacks.
    pub fn from_llm_value(kind: ContentKind, value: &Value) -> Self {
        match kind {
            ContentKind::Nutrition => {
                GeneratedContent::Nutrition(NutritionPlan::from_llm_value(value))
            }
            ContentKind::Supplements => {
                GeneratedContent::Supplements(SupplementList::from_llm_value(value))
            }
            ContentKind::Flexibility => {
                GeneratedContent::Flexibility(FlexibilityPlan::from_llm_value(value))
            }
        }
    }
}

// ─── Field helpers ───────────────────────────────────────────

/// Non-negative integer; integral floats and numeric strings are accepted.
fn field_u32(obj: &Map<String, Value>, key: &str, default: u32) -> u32 {
    let parsed = match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}

fn field_f64(obj: &Map<String, Value>, key: &str, default: f64) -> f64 {
    let parsed = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(default)
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn field_string(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    non_empty_str(obj.get(key)).unwrap_or_else(|| default.to_string())
}

fn string_items(value: Option<&Value>) -> Option<Vec<String>> {
    let items: Vec<String> = value?
        .as_array()?
        .iter()
        .filter_map(|v| non_empty_str(Some(v)))
        .collect();
    (!items.is_empty()).then_some(items)
}

fn field_string_list(obj: &Map<String, Value>, key: &str, default: Vec<String>) -> Vec<String> {
    string_items(obj.get(key)).unwrap_or(default)
}

/// Array of objects; items that can't be rebuilt are dropped, and an array
/// left empty falls back to the default list.
fn field_list<T>(
    obj: &Map<String, Value>,
    key: &str,
    default: Vec<T>,
    item: impl Fn(&Map<String, Value>) -> Option<T>,
) -> Vec<T> {
    let items: Vec<T> = obj
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_object)
                .filter_map(&item)
                .collect()
        })
        .unwrap_or_default();

    if items.is_empty() {
        default
    } else {
        items
    }
}

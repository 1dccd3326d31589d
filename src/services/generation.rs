// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation generation: profile → prompt → LLM → validated document.

use crate::error::AppError;
use crate::models::{ContentKind, GeneratedContent, NutritionPlan, UserProfile};
use crate::services::llm::LlmProvider;
use crate::services::prompts::{build_prompt, extract_json};
use std::sync::Arc;
use std::time::Duration;

/// Generates recommendation documents through an [`LlmProvider`].
#[derive(Clone)]
pub struct GenerationService {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl GenerationService {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Deadline applied to a whole generation.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate one document, failing with [`AppError::Timeout`] past the deadline.
    pub async fn generate(
        &self,
        profile: &UserProfile,
        kind: ContentKind,
    ) -> Result<GeneratedContent, AppError> {
        tokio::time::timeout(self.timeout, self.request_content(profile, kind))
            .await
            .map_err(|_| {
                tracing::warn!(
                    content_type = %kind,
                    timeout_secs = self.timeout.as_secs(),
                    "Content generation timed out"
                );
                AppError::Timeout(format!("{} generation", kind))
            })?
    }

    /// Generate one document with no deadline of its own.
    ///
    /// Callers that already bound the operation (the dashboard's load driver)
    /// use this so only one timer is in play.
    pub async fn request_content(
        &self,
        profile: &UserProfile,
        kind: ContentKind,
    ) -> Result<GeneratedContent, AppError> {
        let prompt = build_prompt(kind, profile);
        tracing::debug!(content_type = %kind, "Requesting content from LLM");

        let reply = self.llm.complete(&prompt).await?;
        let value = extract_json(&reply)?;

        Ok(GeneratedContent::from_llm_value(kind, &value))
    }

    /// Nutrition endpoint semantics: never fails, falls back to the default plan.
    pub async fn generate_nutrition_or_default(&self, profile: &UserProfile) -> NutritionPlan {
        match self.generate(profile, ContentKind::Nutrition).await {
            Ok(GeneratedContent::Nutrition(plan)) => plan,
            Ok(other) => {
                tracing::error!(content_type = %other.kind(), "Unexpected document kind");
                NutritionPlan::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Nutrition generation failed, serving default plan");
                NutritionPlan::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::ChatPrompt;
    use async_trait::async_trait;

    struct FixedReply(&'static str);

    #[async_trait]
    impl LlmProvider for FixedReply {
        async fn complete(&self, _prompt: &ChatPrompt) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    struct NeverReplies;

    #[async_trait]
    impl LlmProvider for NeverReplies {
        async fn complete(&self, _prompt: &ChatPrompt) -> Result<String, AppError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("{}".to_string())
        }
    }

    fn service(llm: impl LlmProvider + 'static) -> GenerationService {
        GenerationService::new(Arc::new(llm), Duration::from_secs(25))
    }

    #[tokio::test]
    async fn test_generate_applies_fallbacks() {
        let svc = service(FixedReply(r#"```json
{"sessionsPerWeek": 4, "exercises": [{"name": "Pigeon", "targetArea": "Hanches"}]}
```"#));

        let content = svc
            .generate(&UserProfile::default(), ContentKind::Flexibility)
            .await
            .unwrap();

        match content {
            GeneratedContent::Flexibility(plan) => {
                assert_eq!(plan.sessions_per_week, 4);
                assert_eq!(plan.exercises[0].name, "Pigeon");
                assert_eq!(plan.session_duration_minutes, 20);
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_reply_is_an_error() {
        let svc = service(FixedReply("Je ne peux pas répondre."));
        let err = svc
            .generate(&UserProfile::default(), ContentKind::Supplements)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_times_out_after_deadline() {
        let svc = service(NeverReplies);
        let err = svc
            .generate(&UserProfile::default(), ContentKind::Nutrition)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nutrition_timeout_resolves_to_default_plan() {
        let svc = service(NeverReplies);
        let started = tokio::time::Instant::now();

        let plan = svc.generate_nutrition_or_default(&UserProfile::default()).await;

        assert_eq!(plan, NutritionPlan::default());
        assert!(started.elapsed() >= Duration::from_secs(25));
        assert!(started.elapsed() < Duration::from_secs(26));
    }
}

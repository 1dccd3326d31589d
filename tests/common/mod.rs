// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use fitcoach::config::Config;
use fitcoach::db::MemoryBackend;
use fitcoach::error::AppError;
use fitcoach::routes::create_router;
use fitcoach::services::{ChatPrompt, LlmProvider};
use fitcoach::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// One reply that fills in a few fields of every document kind.
#[allow(dead_code)]
pub const STUB_REPLY: &str = r#"{
    "dailyCalories": 2400,
    "supplements": [{"name": "Magnésium", "dosage": "300 mg", "timing": "Le soir"}],
    "sessionsPerWeek": 5
}"#;

/// How the stub LLM behaves.
#[allow(dead_code)]
pub enum StubBehavior {
    Reply(&'static str),
    Fail,
    Hang,
}

/// LLM stand-in that counts calls.
pub struct StubLlm {
    behavior: StubBehavior,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubLlm {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, _prompt: &ChatPrompt) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StubBehavior::Reply(text) => Ok(text.to_string()),
            StubBehavior::Fail => Err(AppError::Generation("LLM returned 500".to_string())),
            StubBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("{}".to_string())
            }
        }
    }
}

/// Everything a test may want to poke at.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub backend: Arc<MemoryBackend>,
    pub llm: Arc<StubLlm>,
}

/// Create a test app over the in-memory backend and a stub LLM.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), StubBehavior::Reply(STUB_REPLY))
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, behavior: StubBehavior) -> TestApp {
    let backend = Arc::new(MemoryBackend::default());
    let llm = Arc::new(StubLlm::new(behavior));
    let state = Arc::new(AppState::new(config, backend.clone(), llm.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        backend,
        llm,
    }
}

/// Send a JSON request, optionally with a bearer token.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register an account through the API and return its app JWT.
#[allow(dead_code)]
pub async fn register(app: &Router, email: &str) -> String {
    let response = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(serde_json::json!({
            "email": email,
            "password": "motdepasse",
            "name": "Camille"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    json_body(response).await["token"]
        .as_str()
        .expect("registration returned no token")
        .to_string()
}

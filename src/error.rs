// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Classified authentication failure reported by the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    EmailNotConfirmed,
    UserAlreadyExists,
    WeakPassword,
    RateLimited,
    SessionExpired,
    Other(String),
}

impl AuthFailure {
    /// Classify a backend auth error.
    ///
    /// The machine-readable `error_code` wins; the HTTP status is used when the
    /// backend omits it, and the message is only consulted as a last resort.
    pub fn classify(status: u16, error_code: Option<&str>, message: &str) -> Self {
        match error_code {
            Some("invalid_credentials") | Some("invalid_grant") => {
                return AuthFailure::InvalidCredentials
            }
            Some("email_not_confirmed") => return AuthFailure::EmailNotConfirmed,
            Some("user_already_exists") | Some("email_exists") => {
                return AuthFailure::UserAlreadyExists
            }
            Some("weak_password") => return AuthFailure::WeakPassword,
            Some("over_request_rate_limit") | Some("over_email_send_rate_limit") => {
                return AuthFailure::RateLimited
            }
            Some("session_not_found")
            | Some("session_expired")
            | Some("refresh_token_not_found") => {
                return AuthFailure::SessionExpired
            }
            _ => {}
        }

        match status {
            429 => return AuthFailure::RateLimited,
            401 | 403 => return AuthFailure::SessionExpired,
            _ => {}
        }

        let lower = message.to_lowercase();
        if lower.contains("invalid login credentials") {
            AuthFailure::InvalidCredentials
        } else if lower.contains("email not confirmed") {
            AuthFailure::EmailNotConfirmed
        } else if lower.contains("already registered") {
            AuthFailure::UserAlreadyExists
        } else {
            AuthFailure::Other(message.to_string())
        }
    }

    /// Stable identifier used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::InvalidCredentials => "invalid_credentials",
            AuthFailure::EmailNotConfirmed => "email_not_confirmed",
            AuthFailure::UserAlreadyExists => "user_already_exists",
            AuthFailure::WeakPassword => "weak_password",
            AuthFailure::RateLimited => "rate_limited",
            AuthFailure::SessionExpired => "session_expired",
            AuthFailure::Other(_) => "auth_error",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::InvalidCredentials => write!(f, "Invalid login credentials"),
            AuthFailure::EmailNotConfirmed => write!(f, "Email not confirmed"),
            AuthFailure::UserAlreadyExists => write!(f, "User already registered"),
            AuthFailure::WeakPassword => write!(f, "Password is too weak"),
            AuthFailure::RateLimited => write!(f, "Too many requests"),
            AuthFailure::SessionExpired => write!(f, "Session expired"),
            AuthFailure::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Content generation error: {0}")]
    Generation(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the error means the caller has to log in again.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized
                | AppError::InvalidToken
                | AppError::Auth(AuthFailure::SessionExpired)
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Auth(failure) => {
                let status = match failure {
                    AuthFailure::UserAlreadyExists => StatusCode::CONFLICT,
                    AuthFailure::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    AuthFailure::WeakPassword => StatusCode::BAD_REQUEST,
                    _ => StatusCode::UNAUTHORIZED,
                };
                (status, failure.code(), Some(failure.to_string()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Backend(msg) => {
                tracing::error!(error = %msg, "Backend error");
                (StatusCode::BAD_GATEWAY, "backend_error", None)
            }
            AppError::Generation(msg) => {
                (StatusCode::BAD_GATEWAY, "generation_error", Some(msg.clone()))
            }
            AppError::Timeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "timeout", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

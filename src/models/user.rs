//! Account and session models exchanged with the hosted backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record held by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendUser {
    /// Account ID (also the owner key of profile rows)
    pub id: Uuid,
    pub email: Option<String>,
    /// Set once the address was confirmed
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Token pair issued by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token stops being accepted
    pub expires_at: DateTime<Utc>,
    pub user: BackendUser,
}

/// Outcome of a registration.
///
/// `session` is `None` when the backend requires email confirmation first.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: BackendUser,
    pub session: Option<AuthSession>,
}

/// The authenticated caller of a profile operation.
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub account_id: Uuid,
    /// Backend access token used for row-level access
    pub access_token: String,
}

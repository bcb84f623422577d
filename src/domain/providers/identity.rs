//! Identity provider port (Firebase Authentication).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account record held by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Claims of a successfully verified ID token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

/// Input for [`IdentityProvider::create_user`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewIdentityUser {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("ID token has expired")]
    TokenExpired,

    #[error("Invalid ID token: {0}")]
    InvalidToken(String),

    /// Provider rejected the call; `code` uses the `auth/...` vocabulary.
    #[error("{}", describe_auth_code(.code))]
    Provider { code: String, message: String },

    #[error("Identity provider unreachable: {0}")]
    Transport(String),

    #[error("Identity provider credentials error: {0}")]
    Credentials(String),
}

impl IdentityError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Human readable message for an `auth/...` error code.
pub fn describe_auth_code(code: &str) -> &'static str {
    match code {
        "auth/invalid-id-token" => "Invalid ID token",
        "auth/id-token-expired" => "ID token has expired",
        "auth/id-token-revoked" => "ID token has been revoked",
        "auth/user-not-found" => "User not found",
        "auth/user-disabled" => "User account has been disabled",
        "auth/invalid-uid" => "Invalid user ID",
        "auth/uid-already-exists" => "User ID already exists",
        "auth/email-already-exists" => "Email already exists",
        "auth/invalid-email" => "Invalid email address",
        "auth/invalid-password" => "Invalid password",
        "auth/weak-password" => "Password is too weak",
        _ => "Firebase authentication error",
    }
}

/// Verifies ID tokens and manages identity accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer ID token and return its claims.
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError>;

    /// Look up an account by uid. `Ok(None)` when the account does not exist.
    async fn get_user(&self, uid: &str) -> Result<Option<IdentityUser>, IdentityError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, IdentityError>;

    async fn create_user(&self, user: NewIdentityUser) -> Result<IdentityUser, IdentityError>;
}

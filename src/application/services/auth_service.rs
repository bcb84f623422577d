//! Internal Token Service
//!
//! HS256 tokens for service-to-service calls (`/api/users/batch-update`,
//! `/api/users/stats`). Mobile clients authenticate with identity-provider ID
//! tokens instead; see `presentation::middleware::auth`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;

/// Issues and verifies internal tokens
pub trait AuthService: Send + Sync {
    /// Sign a token for `subject` carrying `permissions`.
    fn issue_token(&self, subject: &str, permissions: Vec<String>) -> Result<IssuedToken, AuthError>;

    /// Verify signature, expiry and issuer.
    fn verify_token(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Internal token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (service or admin identifier)
    pub sub: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    pub fn has_permissions<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|needed| self.permissions.iter().any(|p| p == needed.as_ref()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Internal token errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// AuthService implementation over the configured JWT secret
pub struct AuthServiceImpl {
    settings: JwtSettings,
}

impl AuthServiceImpl {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}

impl AuthService for AuthServiceImpl {
    fn issue_token(&self, subject: &str, permissions: Vec<String>) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let lifetime = Duration::from_std(self.settings.expires_in()).unwrap_or_else(|_| Duration::days(1));
        let claims = Claims {
            sub: subject.to_owned(),
            permissions,
            iss: self.settings.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &self.validation(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        Ok(data.claims)
    }
}

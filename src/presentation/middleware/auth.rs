//! Authentication Middleware
//!
//! - `verify_firebase_token`: mobile clients, identity-provider ID tokens
//! - `verify_internal_jwt`: service callers, HS256 tokens from `AuthService`
//! - `require_permissions`: checks the internal token's `permissions` claim
//! - `validate_api_key`: `X-API-Key` gate in front of all `/api` routes

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use sha2::{Digest, Sha256};

use crate::application::services::{AuthError, Claims};
use crate::domain::providers::{IdentityError, VerifiedToken};
use crate::shared::error::AppError;
use crate::startup::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Caller verified by the identity provider
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

impl From<VerifiedToken> for AuthUser {
    fn from(token: VerifiedToken) -> Self {
        Self {
            uid: token.uid,
            email: token.email,
            name: token.name,
            picture: token.picture,
            email_verified: token.email_verified,
        }
    }
}

impl AuthUser {
    pub fn as_token(&self) -> VerifiedToken {
        VerifiedToken {
            uid: self.uid.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            picture: self.picture.clone(),
            email_verified: self.email_verified,
        }
    }
}

/// Service caller verified by an internal token
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCaller {
    pub claims: Claims,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_owned())
        .filter(|token| !token.is_empty())
}

/// Require a valid identity-provider ID token and attach [`AuthUser`].
pub async fn verify_firebase_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::unauthorized("TOKEN_MISSING", "Authorization token required"))?;

    let verified = state
        .providers
        .identity
        .verify_id_token(&token)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "ID token verification failed");
            match err {
                IdentityError::TokenExpired => AppError::unauthorized("TOKEN_EXPIRED", "Token expired"),
                _ => AppError::unauthorized("TOKEN_INVALID", "Invalid or expired token"),
            }
        })?;

    tracing::Span::current().record("uid", verified.uid.as_str());
    request.extensions_mut().insert(AuthUser::from(verified));
    Ok(next.run(request).await)
}

/// Require a valid internal token and attach [`ServiceCaller`].
pub async fn verify_internal_jwt(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::unauthorized("JWT_MISSING", "JWT token required"))?;

    let claims = state.auth_service.verify_token(&token).map_err(|err| {
        tracing::warn!(error = %err, "Internal token rejected");
        match err {
            AuthError::TokenExpired | AuthError::InvalidToken | AuthError::Signing(_) => {
                AppError::unauthorized("JWT_INVALID", "Invalid JWT token")
            }
        }
    })?;

    request.extensions_mut().insert(ServiceCaller { claims });
    Ok(next.run(request).await)
}

/// Reject callers whose internal token lacks any of `required`.
///
/// ```rust,ignore
/// .route_layer(middleware::from_fn(|req: Request, next: Next| {
///     require_permissions(&["users:write"], req, next)
/// }))
/// ```
pub async fn require_permissions(
    required: &'static [&'static str],
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = request
        .extensions()
        .get::<ServiceCaller>()
        .ok_or_else(|| AppError::unauthorized("AUTH_REQUIRED", "Authentication required"))?;

    if !caller.claims.has_permissions(required) {
        tracing::warn!(sub = %caller.claims.sub, ?required, "Insufficient permissions");
        return Err(AppError::forbidden("PERMISSIONS_INSUFFICIENT", "Insufficient permissions"));
    }

    Ok(next.run(request).await)
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Compare against configured keys by SHA-256 digest.
fn api_key_matches(candidate: &str, configured: &[String]) -> bool {
    let candidate = digest(candidate);
    configured
        .iter()
        .fold(false, |found, key| found | (digest(key) == candidate))
}

/// `X-API-Key` gate. Development accepts requests without a key; a present
/// key is always checked when keys are configured.
pub async fn validate_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let configured = &state.settings.security.api_keys;

    match key {
        None if state.settings.is_development() => {}
        None => return Err(AppError::unauthorized("API_KEY_MISSING", "API key required")),
        Some(key) if !configured.is_empty() && !api_key_matches(key, configured) => {
            tracing::warn!(path = %request.uri().path(), "Rejected unknown API key");
            return Err(AppError::unauthorized("API_KEY_INVALID", "Invalid API key"));
        }
        Some(_) => {}
    }

    Ok(next.run(request).await)
}

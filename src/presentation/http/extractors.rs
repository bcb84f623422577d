//! Custom Extractors
//!
//! Validated JSON bodies and query strings, plus the authenticated caller
//! attached by the auth middleware.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::presentation::middleware::{AuthUser, ServiceCaller};
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;

/// JSON body deserialized and validated. An empty body is read as `{}` so
/// routes whose fields are all optional accept bodiless requests.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request("INVALID_INPUT", rejection.body_text()))?;

        let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_slice::<T>(b"{}")
        } else {
            serde_json::from_slice::<T>(&bytes)
        };
        let value = parsed.map_err(|e| AppError::validation(format!("Invalid request body: {e}")))?;

        value.validate().map_err(validation_error)?;
        Ok(Self(value))
    }
}

/// Query string deserialized and validated.
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        value.validate().map_err(validation_error)?;
        Ok(Self(value))
    }
}

fn auth_required() -> AppError {
    AppError::unauthorized("AUTH_REQUIRED", "Authentication required")
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(auth_required)
    }
}

impl<S> FromRequestParts<S> for ServiceCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ServiceCaller>().cloned().ok_or_else(auth_required)
    }
}

//! Error Detail Exposure
//!
//! Error bodies carry debug `details` only outside production.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::shared::error::DetailedError;

/// Whether error bodies may include `details`.
#[derive(Debug, Clone, Copy)]
pub struct ErrorDetailsPolicy {
    pub expose: bool,
}

impl ErrorDetailsPolicy {
    pub fn for_environment(is_production: bool) -> Self {
        Self { expose: !is_production }
    }
}

/// Re-render error bodies with their details when the policy allows it.
pub async fn expose_error_details(
    State(policy): State<ErrorDetailsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(DetailedError(body)) = response.extensions_mut().remove::<DetailedError>() else {
        return response;
    };
    if !policy.expose {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Json(body).into_response().into_body())
}

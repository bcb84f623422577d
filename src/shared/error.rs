//! Application Error Types
//!
//! Every failed request is rendered as
//! `{success: false, error, code, timestamp, details?}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::providers::{ChatProviderError, DocumentStoreError, IdentityError};

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    Upstream {
        status: StatusCode,
        code: &'static str,
        message: String,
        details: Option<String>,
    },

    #[error("Too many requests from this IP, please try again later.")]
    RateLimited,

    #[error("{message}")]
    Unavailable { code: &'static str, message: String },

    #[error("{message}")]
    Internal {
        code: &'static str,
        message: String,
        details: Option<String>,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    /// Unclassified failure reported under a route-specific code.
    pub fn internal(code: &'static str, message: impl Into<String>, details: impl ToString) -> Self {
        Self::Internal {
            code,
            message: message.into(),
            details: Some(details.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } => *status,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Unavailable { code, .. }
            | AppError::Internal { code, .. } => code,
            AppError::RateLimited => "RATE_LIMITED",
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            AppError::Upstream { details, .. } | AppError::Internal { details, .. } => {
                details.as_deref()
            }
            _ => None,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            tracing::error!(%status, code, error = %self, details = ?self.details(), "Request failed");
        } else {
            tracing::warn!(%status, code, error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code,
            timestamp: chrono::Utc::now().to_rfc3339(),
            details: None,
        };

        let mut response = (status, Json(body.clone())).into_response();
        if let Some(details) = self.details() {
            response.extensions_mut().insert(DetailedError(ErrorResponse {
                details: Some(details.to_owned()),
                ..body
            }));
        }
        response
    }
}

/// The rendered error with `details` filled in. Carried as a response
/// extension; the body only gains it where the deployment allows.
#[derive(Debug, Clone)]
pub struct DetailedError(pub ErrorResponse);

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::TokenExpired => {
                AppError::unauthorized("TOKEN_EXPIRED", "Token expired")
            }
            IdentityError::InvalidToken(_) => {
                AppError::unauthorized("TOKEN_INVALID", "Invalid or expired token")
            }
            err @ IdentityError::Provider { .. } => AppError::Upstream {
                status: StatusCode::UNAUTHORIZED,
                code: "FIREBASE_AUTH_ERROR",
                message: err.to_string(),
                details: None,
            },
            err => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                code: "FIREBASE_AUTH_ERROR",
                message: "Firebase authentication error".into(),
                details: Some(err.to_string()),
            },
        }
    }
}

impl From<ChatProviderError> for AppError {
    fn from(err: ChatProviderError) -> Self {
        let status = match &err {
            ChatProviderError::Api { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ChatProviderError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };
        let message = match &err {
            ChatProviderError::Api { message, .. } => message.clone(),
            _ => "Stream Chat error".into(),
        };
        AppError::Upstream {
            status,
            code: "STREAM_CHAT_ERROR",
            message,
            details: Some(err.to_string()),
        }
    }
}

impl From<DocumentStoreError> for AppError {
    fn from(err: DocumentStoreError) -> Self {
        AppError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            code: "FIRESTORE_ERROR",
            message: "Document store error".into(),
            details: Some(err.to_string()),
        }
    }
}

//! Client Configuration Handlers

use axum::extract::State;

use crate::application::dto::MapsKeyResponse;
use crate::platform::{MethodCall, MethodResult, GET_GOOGLE_API_KEY};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

/// `GET /api/config/maps-key`
pub async fn maps_key(State(state): State<AppState>, _user: AuthUser) -> Result<ApiResponse<MapsKeyResponse>, AppError> {
    match state.platform.handle(&MethodCall::new(GET_GOOGLE_API_KEY)) {
        MethodResult::Success { value } => {
            let google_api_key = value.as_str().unwrap_or_default().to_owned();
            Ok(ApiResponse::ok(
                MapsKeyResponse { google_api_key },
                "Maps key retrieved successfully",
            ))
        }
        MethodResult::Error { message, .. } => Err(AppError::Unavailable {
            code: "UNAVAILABLE",
            message,
        }),
        MethodResult::NotImplemented => Err(AppError::Internal {
            code: "CONFIG_ERROR",
            message: "Configuration method not implemented".into(),
            details: None,
        }),
    }
}

//! Authentication Handlers
//!
//! Session bootstrap for the mobile app: the caller is already signed in
//! with the identity provider; these routes sync the account and hand out
//! chat credentials.

use axum::extract::State;
use chrono::Utc;
use serde_json::Value;

use super::Failure;
use crate::application::dto::{
    DeleteAccountRequest, LoginRequest, LoginResponse, ProfileResponse, RefreshTokenRequest, TokenRefreshResponse,
    UpdateProfileRequest, ValidateTokenResponse,
};
use crate::domain::providers::Document;
use crate::domain::UserProfile;
use crate::presentation::http::extractors::ValidJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

/// Keys owned by the backend; `userData` at login cannot set them.
const SERVER_MANAGED_FIELDS: &[&str] = &[
    "id",
    "uid",
    "email",
    "role",
    "deleted",
    "deletedAt",
    "searchName",
    "createdAt",
    "updatedAt",
];

/// Profile fields from the verified token, overridden by whatever the app sent.
fn login_profile(user: &AuthUser, user_data: Option<Document>) -> Document {
    let mut user_data = user_data.unwrap_or_default();
    for key in SERVER_MANAGED_FIELDS {
        if user_data.remove(*key).is_some() {
            tracing::debug!(uid = %user.uid, field = *key, "Ignoring server-managed login field");
        }
    }
    let mut data = Document::new();

    let name = user_data.get("name").cloned().or_else(|| user.name.clone().map(Value::String));
    let image = user_data.get("image").cloned().or_else(|| user.picture.clone().map(Value::String));
    for (key, value) in [("name", name), ("image", image), ("email", user.email.clone().map(Value::String))] {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            data.insert(key.into(), value);
        }
    }

    data.extend(user_data);
    data
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    const FAILURE: Failure = Failure::new("LOGIN_ERROR", "Login failed");

    let data = login_profile(&user, body.user_data);
    let synced = state
        .user_service
        .get_or_create_user(&user.uid, data)
        .await
        .map_err(|e| FAILURE.user(e))?;

    let expires_at = body.token_options.and_then(|o| o.exp);
    let token = state
        .user_service
        .generate_user_token(&user.uid, expires_at)
        .await
        .map_err(|e| FAILURE.user(e))?;

    tracing::info!(uid = %user.uid, created = synced.created, "User logged in");
    let response = LoginResponse::new(synced, token, &state.settings.stream.api_key);
    Ok(ApiResponse::ok(response, "Login successful"))
}

/// `POST /api/auth/refresh-token`
pub async fn refresh_token(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<RefreshTokenRequest>,
) -> Result<ApiResponse<TokenRefreshResponse>, AppError> {
    let expires_at = body.token_options.and_then(|o| o.exp);
    let token = state
        .user_service
        .generate_user_token(&user.uid, expires_at)
        .await
        .map_err(|e| Failure::new("TOKEN_REFRESH_ERROR", "Token refresh failed").user(e))?;

    Ok(ApiResponse::ok(
        TokenRefreshResponse::new(token, &state.settings.stream.api_key),
        "Token refreshed successfully",
    ))
}

/// `GET /api/auth/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<ProfileResponse>, AppError> {
    let view = state
        .user_service
        .get_user_profile(&user.uid)
        .await
        .map_err(|e| Failure::new("PROFILE_ERROR", "Failed to retrieve profile").user(e))?;

    Ok(ApiResponse::ok(ProfileResponse::from(view), "Profile retrieved successfully"))
}

/// `PUT /api/auth/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<UpdateProfileRequest>,
) -> Result<ApiResponse<UserProfile>, AppError> {
    let updates = body.into_document();
    if updates.is_empty() {
        return Err(AppError::bad_request("INVALID_INPUT", "No profile fields provided"));
    }

    let profile = state
        .user_service
        .update_user_profile(&user.uid, updates)
        .await
        .map_err(|e| Failure::new("PROFILE_UPDATE_ERROR", "Failed to update profile").user(e))?;

    Ok(ApiResponse::ok(profile, "Profile updated successfully"))
}

/// `DELETE /api/auth/account`
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<DeleteAccountRequest>,
) -> Result<ApiResponse<()>, AppError> {
    let options = body.delete_options.unwrap_or_default().into();
    state
        .user_service
        .delete_user(&user.uid, options)
        .await
        .map_err(|e| Failure::new("ACCOUNT_DELETE_ERROR", "Failed to delete account").user(e))?;

    tracing::info!(uid = %user.uid, "Account deleted");
    Ok(ApiResponse::message("Account deleted successfully"))
}

/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<ApiResponse<()>, AppError> {
    state
        .user_service
        .set_presence(&user.uid, Some(false), Some(Utc::now()))
        .await
        .map_err(|e| Failure::new("LOGOUT_ERROR", "Logout failed").user(e))?;

    Ok(ApiResponse::message("Logout successful"))
}

/// `GET /api/auth/validate-token`
pub async fn validate_token(user: AuthUser) -> ApiResponse<ValidateTokenResponse> {
    ApiResponse::ok(ValidateTokenResponse::from(&user.as_token()), "Token is valid")
}

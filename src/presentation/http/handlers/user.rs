//! User Handlers

use axum::extract::{Path, State};
use serde_json::Value;

use super::Failure;
use crate::application::dto::{
    BatchUpdateRequest, BatchUpdateResponse, OnlineUser, OnlineUsersQuery, OnlineUsersResponse, PublicProfile,
    SearchFilters, SearchUsersQuery, SearchUsersResponse, StatusResponse, UpdateStatusRequest,
    UserConversationsResponse, UserSummary,
};
use crate::application::services::{UserFilters, UserStats, UserUpdate};
use crate::domain::dm_channel_id;
use crate::presentation::http::extractors::{ValidJson, ValidQuery};
use crate::presentation::middleware::{AuthUser, ServiceCaller};
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const DEFAULT_ONLINE_LIMIT: u32 = 50;

/// `GET /api/users/search`; the caller is left out of the results.
pub async fn search_users(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<SearchUsersQuery>,
) -> Result<ApiResponse<SearchUsersResponse>, AppError> {
    let text = query.q.as_deref().map(str::trim).unwrap_or_default().to_owned();
    let filters = UserFilters {
        role: query.role.map(|r| r.as_str().to_owned()),
        online: query.online,
    };
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT) as usize;

    let users: Vec<UserSummary> = state
        .user_service
        .search_users(&text, filters.clone(), limit)
        .await
        .map_err(|e| Failure::new("SEARCH_USERS_ERROR", "Failed to search users").user(e))?
        .into_iter()
        .filter(|profile| profile.uid != user.uid)
        .map(UserSummary::from)
        .collect();

    let response = SearchUsersResponse {
        total: users.len(),
        users,
        query: text,
        filters: SearchFilters::from(&filters),
    };
    Ok(ApiResponse::ok(response, "Users retrieved successfully"))
}

/// `GET /api/users/online`
pub async fn online_users(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<OnlineUsersQuery>,
) -> Result<ApiResponse<OnlineUsersResponse>, AppError> {
    let filters = UserFilters {
        role: None,
        online: Some(true),
    };
    let limit = query.limit.unwrap_or(DEFAULT_ONLINE_LIMIT) as usize;

    let users: Vec<OnlineUser> = state
        .user_service
        .search_users("", filters, limit)
        .await
        .map_err(|e| Failure::new("GET_ONLINE_USERS_ERROR", "Failed to get online users").user(e))?
        .into_iter()
        .filter(|profile| profile.uid != user.uid)
        .map(OnlineUser::from)
        .collect();

    Ok(ApiResponse::ok(
        OnlineUsersResponse {
            total: users.len(),
            users,
        },
        "Online users retrieved successfully",
    ))
}

/// `GET /api/users/{userId}`; private fields only on the caller's own profile.
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<PublicProfile>, AppError> {
    let view = state
        .user_service
        .get_user_profile(&user_id)
        .await
        .map_err(|e| Failure::new("GET_USER_ERROR", "Failed to get user").user(e))?;

    let is_owner = user_id == user.uid;
    Ok(ApiResponse::ok(
        PublicProfile::new(view, is_owner),
        "User profile retrieved successfully",
    ))
}

/// `GET /api/users/{userId}/conversations`: the stored DM channel between
/// the caller and `userId`, if one exists.
pub async fn user_conversations(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<UserConversationsResponse>, AppError> {
    if user_id == user.uid {
        return Err(AppError::bad_request("INVALID_USER", "Cannot get conversations with yourself"));
    }

    let channel_id = dm_channel_id(&user.uid, &user_id);
    let conversations: Vec<Value> = state
        .chat_service
        .find_channel(&channel_id)
        .await
        .map_err(|e| Failure::new("GET_USER_CONVERSATIONS_ERROR", "Failed to get conversations").channel(e))?
        .into_iter()
        .map(|record| Value::Object(record.to_document()))
        .collect();

    Ok(ApiResponse::ok(
        UserConversationsResponse {
            total: conversations.len(),
            conversations,
            other_user: user_id,
        },
        "Conversations retrieved successfully",
    ))
}

/// `PUT /api/users/{userId}/status`
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
    ValidJson(body): ValidJson<UpdateStatusRequest>,
) -> Result<ApiResponse<StatusResponse>, AppError> {
    if user_id != user.uid {
        return Err(AppError::forbidden("ACCESS_DENIED", "Can only update your own status"));
    }
    if body.online.is_none() && body.last_seen_at.is_none() {
        return Err(AppError::bad_request("INVALID_INPUT", "No valid status updates provided"));
    }

    let profile = state
        .user_service
        .set_presence(&user_id, body.online, body.last_seen_at)
        .await
        .map_err(|e| Failure::new("UPDATE_STATUS_ERROR", "Failed to update status").user(e))?;

    Ok(ApiResponse::ok(
        StatusResponse {
            uid: user_id,
            online: profile.online,
            last_seen_at: profile.last_seen_at,
        },
        "Status updated successfully",
    ))
}

/// `POST /api/users/batch-update` (internal token with `users:write`)
pub async fn batch_update(
    State(state): State<AppState>,
    caller: ServiceCaller,
    ValidJson(body): ValidJson<BatchUpdateRequest>,
) -> Result<ApiResponse<BatchUpdateResponse>, AppError> {
    const FAILURE: Failure = Failure::new("BATCH_UPDATE_ERROR", "Batch update failed");

    if !body.updates.is_array() {
        return Err(AppError::bad_request("INVALID_INPUT", "Updates must be an array"));
    }
    let updates: Vec<UserUpdate> = serde_json::from_value(body.updates)
        .map_err(|e| AppError::validation(format!("updates: {e}")))?;

    let updated_count = state
        .user_service
        .batch_update_users(updates)
        .await
        .map_err(|e| FAILURE.user(e))?;

    tracing::info!(caller = %caller.claims.sub, updated_count, "Batch user update applied");
    Ok(ApiResponse::ok(
        BatchUpdateResponse {
            success: true,
            updated_count,
        },
        "Batch update completed successfully",
    ))
}

/// `GET /api/users/stats` (internal token with `users:read`)
pub async fn user_stats(
    State(state): State<AppState>,
    _caller: ServiceCaller,
) -> Result<ApiResponse<UserStats>, AppError> {
    let stats = state
        .user_service
        .user_stats()
        .await
        .map_err(|e| Failure::new("GET_STATS_ERROR", "Failed to get user statistics").user(e))?;

    Ok(ApiResponse::ok(stats, "User statistics retrieved successfully"))
}

//! Chat Handlers
//!
//! Direct messages, group channels and channel management under `/api/chat`.

use axum::extract::{Path, State};

use super::Failure;
use crate::application::dto::{
    AnalyticsQuery, ConversationsQuery, ConversationsResponse, CreateDirectMessageRequest, CreateGroupRequest,
    DeleteChannelRequest, MembersRequest, UpdateChannelRequest,
};
use crate::application::services::{
    AnalyticsRange, ChannelAnalytics, ChannelCreated, ChannelDeleted, ChannelUpdated, ConversationOptions,
    DirectMessageOptions, GroupOptions, MembersAdded, MembersRemoved,
};
use crate::domain::ChannelRecord;
use crate::presentation::http::extractors::{ValidJson, ValidQuery};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::shared::validation::dedup_ids;
use crate::startup::AppState;

fn trimmed_ids(ids: Vec<String>) -> Vec<String> {
    dedup_ids(ids.into_iter().map(|id| id.trim().to_owned()))
}

/// `GET /api/chat/conversations`
pub async fn conversations(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<ConversationsQuery>,
) -> Result<ApiResponse<ConversationsResponse>, AppError> {
    let defaults = ConversationOptions::default();
    let options = ConversationOptions {
        limit: query.limit.map_or(defaults.limit, |l| l as usize),
        include_stream: query.include_stream.unwrap_or(defaults.include_stream),
    };

    let conversations = state
        .chat_service
        .get_user_conversations(&user.uid, options)
        .await
        .map_err(|e| Failure::new("CONVERSATIONS_ERROR", "Failed to get conversations").channel(e))?;

    Ok(ApiResponse::ok(
        ConversationsResponse {
            total: conversations.len(),
            conversations,
        },
        "Conversations retrieved successfully",
    ))
}

/// `POST /api/chat/dm`
pub async fn create_direct_message(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<CreateDirectMessageRequest>,
) -> Result<ApiResponse<ChannelCreated>, AppError> {
    let other = body.other_user_id.trim();
    if other == user.uid {
        return Err(AppError::bad_request("INVALID_DM_USERS", "Cannot create DM with yourself"));
    }

    let options = DirectMessageOptions {
        initial_message: body.message.map(|m| m.trim().to_owned()).filter(|m| !m.is_empty()),
    };
    let channel = state
        .chat_service
        .create_direct_message(&user.uid, other, options)
        .await
        .map_err(|e| Failure::new("CREATE_DM_ERROR", "Failed to create direct message").channel(e))?;

    Ok(ApiResponse::ok(channel, "Direct message channel created successfully"))
}

/// `POST /api/chat/group`; the creator is always a member and need not be listed.
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<CreateGroupRequest>,
) -> Result<ApiResponse<ChannelCreated>, AppError> {
    let members: Vec<String> = trimmed_ids(body.members)
        .into_iter()
        .filter(|id| *id != user.uid)
        .collect();

    let options = GroupOptions {
        description: body.description.map(|d| d.trim().to_owned()),
        is_private: body.is_private.unwrap_or(false),
        allow_member_invites: body.allow_member_invites.unwrap_or(true),
        ..Default::default()
    };
    let channel = state
        .chat_service
        .create_group_channel(&user.uid, members, body.name.trim(), options)
        .await
        .map_err(|e| Failure::new("CREATE_GROUP_ERROR", "Failed to create group channel").channel(e))?;

    Ok(ApiResponse::ok(channel, "Group channel created successfully"))
}

/// `GET /api/chat/channel/{channelId}`
pub async fn get_channel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<ChannelRecord>, AppError> {
    let channel = state
        .chat_service
        .get_channel(&channel_id, &user.uid)
        .await
        .map_err(|e| Failure::new("GET_CHANNEL_ERROR", "Failed to get channel").channel(e))?;

    Ok(ApiResponse::ok(channel, "Channel details retrieved successfully"))
}

/// `PUT /api/chat/channel/{channelId}`
pub async fn update_channel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    ValidJson(body): ValidJson<UpdateChannelRequest>,
) -> Result<ApiResponse<ChannelUpdated>, AppError> {
    let updates = body.into_document();
    if updates.is_empty() {
        return Err(AppError::bad_request("INVALID_INPUT", "No channel updates provided"));
    }

    let result = state
        .chat_service
        .update_channel(&channel_id, updates, &user.uid)
        .await
        .map_err(|e| Failure::new("UPDATE_CHANNEL_ERROR", "Failed to update channel").channel(e))?;

    Ok(ApiResponse::ok(result, "Channel updated successfully"))
}

/// `DELETE /api/chat/channel/{channelId}`
pub async fn delete_channel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    ValidJson(body): ValidJson<DeleteChannelRequest>,
) -> Result<ApiResponse<ChannelDeleted>, AppError> {
    let result = state
        .chat_service
        .delete_channel(&channel_id, &user.uid, body.hard_delete)
        .await
        .map_err(|e| Failure::new("DELETE_CHANNEL_ERROR", "Failed to delete channel").channel(e))?;

    let message = if body.hard_delete {
        "Channel deleted permanently"
    } else {
        "Channel archived successfully"
    };
    Ok(ApiResponse::ok(result, message))
}

/// `POST /api/chat/channel/{channelId}/members`
pub async fn add_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    ValidJson(body): ValidJson<MembersRequest>,
) -> Result<ApiResponse<MembersAdded>, AppError> {
    let result = state
        .chat_service
        .add_members_to_channel(&channel_id, trimmed_ids(body.member_ids), &user.uid)
        .await
        .map_err(|e| Failure::new("ADD_MEMBERS_ERROR", "Failed to add members").channel(e))?;

    Ok(ApiResponse::ok(result, "Members added successfully"))
}

/// `DELETE /api/chat/channel/{channelId}/members`
pub async fn remove_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    ValidJson(body): ValidJson<MembersRequest>,
) -> Result<ApiResponse<MembersRemoved>, AppError> {
    let result = state
        .chat_service
        .remove_members_from_channel(&channel_id, trimmed_ids(body.member_ids), &user.uid)
        .await
        .map_err(|e| Failure::new("REMOVE_MEMBERS_ERROR", "Failed to remove members").channel(e))?;

    Ok(ApiResponse::ok(result, "Members removed successfully"))
}

/// `GET /api/chat/channel/{channelId}/analytics`
pub async fn channel_analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    ValidQuery(query): ValidQuery<AnalyticsQuery>,
) -> Result<ApiResponse<ChannelAnalytics>, AppError> {
    let range = AnalyticsRange {
        start: query.start_date,
        end: query.end_date,
    };
    let analytics = state
        .chat_service
        .channel_analytics(&channel_id, &user.uid, range)
        .await
        .map_err(|e| Failure::new("ANALYTICS_ERROR", "Failed to get channel analytics").channel(e))?;

    Ok(ApiResponse::ok(analytics, "Channel analytics retrieved successfully"))
}

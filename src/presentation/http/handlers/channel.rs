//! Channel Discovery Handlers
//!
//! Public team channels under `/api/channels`: browse, search, trending,
//! join/leave, members and message history.

use axum::extract::{Path, State};

use super::Failure;
use crate::application::dto::{
    ChannelMembersQuery, ChannelMessagesQuery, ChannelMessagesResponse, PublicChannelsQuery, PublicChannelsResponse,
    SearchChannelsQuery, SearchChannelsResponse, TrendingChannelsQuery, TrendingChannelsResponse,
};
use crate::application::services::{JoinedChannel, LeftChannel, MemberPage, MessageView};
use crate::domain::providers::MessagePage;
use crate::presentation::http::extractors::ValidQuery;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

const DEFAULT_LIST_LIMIT: u32 = 20;
const DEFAULT_MEMBER_LIMIT: u32 = 50;
const DEFAULT_MESSAGE_LIMIT: u32 = 30;

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// `GET /api/channels/public`
pub async fn public_channels(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<PublicChannelsQuery>,
) -> Result<ApiResponse<PublicChannelsResponse>, AppError> {
    let search = non_empty(query.search);
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT) as usize;

    let channels = state
        .chat_service
        .public_channels(&user.uid, search.clone(), limit)
        .await
        .map_err(|e| Failure::new("GET_PUBLIC_CHANNELS_ERROR", "Failed to get public channels").channel(e))?;

    Ok(ApiResponse::ok(
        PublicChannelsResponse {
            total: channels.len(),
            channels,
            search,
        },
        "Public channels retrieved successfully",
    ))
}

/// `POST /api/channels/{channelId}/join`
pub async fn join_channel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<JoinedChannel>, AppError> {
    let joined = state
        .chat_service
        .join_channel(&user.uid, &channel_id)
        .await
        .map_err(|e| Failure::new("JOIN_CHANNEL_ERROR", "Failed to join channel").channel(e))?;

    Ok(ApiResponse::ok(joined, "Successfully joined channel"))
}

/// `POST /api/channels/{channelId}/leave`
pub async fn leave_channel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<LeftChannel>, AppError> {
    let left = state
        .chat_service
        .leave_channel(&user.uid, &channel_id)
        .await
        .map_err(|e| Failure::new("LEAVE_CHANNEL_ERROR", "Failed to leave channel").channel(e))?;

    Ok(ApiResponse::ok(left, "Successfully left channel"))
}

/// `GET /api/channels/{channelId}/members`
pub async fn channel_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    ValidQuery(query): ValidQuery<ChannelMembersQuery>,
) -> Result<ApiResponse<MemberPage>, AppError> {
    let offset = query.offset.unwrap_or(0) as usize;
    let limit = query.limit.unwrap_or(DEFAULT_MEMBER_LIMIT) as usize;

    let page = state
        .chat_service
        .channel_members(&user.uid, &channel_id, offset, limit)
        .await
        .map_err(|e| Failure::new("GET_MEMBERS_ERROR", "Failed to get channel members").channel(e))?;

    Ok(ApiResponse::ok(page, "Channel members retrieved successfully"))
}

/// `GET /api/channels/{channelId}/messages`
pub async fn channel_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    ValidQuery(query): ValidQuery<ChannelMessagesQuery>,
) -> Result<ApiResponse<ChannelMessagesResponse<MessageView>>, AppError> {
    let page = MessagePage {
        limit: query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT) as usize,
        id_lt: non_empty(query.before),
        id_gt: non_empty(query.after),
    };

    let messages = state
        .chat_service
        .channel_messages(&user.uid, &channel_id, page)
        .await
        .map_err(|e| Failure::new("GET_MESSAGES_ERROR", "Failed to get channel messages").channel(e))?;

    Ok(ApiResponse::ok(
        ChannelMessagesResponse {
            total: messages.len(),
            messages,
            channel_id,
        },
        "Channel messages retrieved successfully",
    ))
}

/// `GET /api/channels/search`
pub async fn search_channels(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<SearchChannelsQuery>,
) -> Result<ApiResponse<SearchChannelsResponse>, AppError> {
    let text = query.q.trim().to_owned();
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT) as usize;

    let channels = state
        .chat_service
        .search_channels(&user.uid, &text, query.kind, limit)
        .await
        .map_err(|e| Failure::new("SEARCH_CHANNELS_ERROR", "Failed to search channels").channel(e))?;

    Ok(ApiResponse::ok(
        SearchChannelsResponse {
            total: channels.len(),
            channels,
            query: text,
        },
        "Channel search completed successfully",
    ))
}

/// `GET /api/channels/trending`
pub async fn trending_channels(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<TrendingChannelsQuery>,
) -> Result<ApiResponse<TrendingChannelsResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT) as usize;

    let channels = state
        .chat_service
        .trending_channels(&user.uid, query.timeframe, limit)
        .await
        .map_err(|e| Failure::new("GET_TRENDING_ERROR", "Failed to get trending channels").channel(e))?;

    Ok(ApiResponse::ok(
        TrendingChannelsResponse {
            total: channels.len(),
            channels,
            timeframe: query.timeframe,
        },
        "Trending channels retrieved successfully",
    ))
}

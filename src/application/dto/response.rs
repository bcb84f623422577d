//! Response DTOs
//!
//! `data` payloads of the success envelope. Field names are camelCase to
//! match what the mobile app reads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::application::services::{
    ChannelSummary, Conversation, SyncedUser, Timeframe, UserFilters, UserProfileView, UserToken,
};
use crate::domain::providers::{ChatUser, VerifiedToken};
use crate::domain::UserProfile;

/// Chat SDK credentials handed to the app
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCredentials {
    pub token: String,
    pub api_key: String,
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub profile: UserProfile,
}

/// `POST /api/auth/login`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: LoginUser,
    pub stream_chat: StreamCredentials,
}

impl LoginResponse {
    pub fn new(synced: SyncedUser, token: UserToken, api_key: &str) -> Self {
        Self {
            user: LoginUser {
                uid: synced.identity.uid.clone(),
                email: synced.identity.email.clone(),
                name: synced.chat.name.clone(),
                image: synced.chat.image.clone(),
                profile: synced.profile,
            },
            stream_chat: StreamCredentials {
                token: token.token,
                api_key: api_key.to_owned(),
                expires: token.expires,
            },
        }
    }
}

/// `POST /api/auth/refresh-token`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshResponse {
    pub token: String,
    pub api_key: String,
    pub expires: Option<DateTime<Utc>>,
    pub user: ChatUser,
}

impl TokenRefreshResponse {
    pub fn new(token: UserToken, api_key: &str) -> Self {
        Self {
            token: token.token,
            api_key: api_key.to_owned(),
            expires: token.expires,
            user: token.user,
        }
    }
}

/// `GET /api/auth/profile`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: bool,
    pub profile: Option<UserProfile>,
    pub stream_user: Option<ChatUser>,
}

impl From<UserProfileView> for ProfileResponse {
    fn from(view: UserProfileView) -> Self {
        Self {
            uid: view.uid,
            email: view.identity.email,
            name: view.identity.display_name,
            image: view.identity.photo_url,
            email_verified: view.identity.email_verified,
            profile: view.profile,
            stream_user: view.chat,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub email_verified: bool,
}

/// `GET /api/auth/validate-token`
#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub user: TokenUser,
}

impl From<&VerifiedToken> for ValidateTokenResponse {
    fn from(token: &VerifiedToken) -> Self {
        Self {
            valid: true,
            user: TokenUser {
                uid: token.uid.clone(),
                email: token.email.clone(),
                name: token.name.clone(),
                email_verified: token.email_verified,
            },
        }
    }
}

/// Search result entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub uid: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email: Option<String>,
    pub online: bool,
    pub role: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<UserProfile> for UserSummary {
    fn from(profile: UserProfile) -> Self {
        Self {
            uid: profile.uid,
            name: profile.name,
            image: profile.image,
            email: profile.email,
            online: profile.online,
            role: profile.role,
            last_seen_at: profile.last_seen_at,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
}

impl From<&UserFilters> for SearchFilters {
    fn from(filters: &UserFilters) -> Self {
        Self {
            role: filters.role.clone(),
            online: filters.online,
        }
    }
}

/// `GET /api/users/search`
#[derive(Debug, Serialize)]
pub struct SearchUsersResponse {
    pub users: Vec<UserSummary>,
    pub total: usize,
    pub query: String,
    pub filters: SearchFilters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub uid: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<UserProfile> for OnlineUser {
    fn from(profile: UserProfile) -> Self {
        Self {
            uid: profile.uid,
            name: profile.name,
            image: profile.image,
            role: profile.role,
            last_seen_at: profile.last_seen_at,
        }
    }
}

/// `GET /api/users/online`
#[derive(Debug, Serialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<OnlineUser>,
    pub total: usize,
}

/// `GET /api/users/{userId}`; private fields only for the owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub uid: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PublicProfile {
    pub fn new(view: UserProfileView, is_owner: bool) -> Self {
        let profile = view.profile.unwrap_or_default();
        let mut public = Self {
            uid: view.uid,
            name: view.identity.display_name.or(profile.name),
            image: view.identity.photo_url.or(profile.image),
            online: profile.online,
            last_seen_at: profile.last_seen_at,
            role: profile.role,
            email: None,
            email_verified: None,
            bio: None,
            preferences: None,
            created_at: None,
        };
        if is_owner {
            public.email = view.identity.email;
            public.email_verified = Some(view.identity.email_verified);
            public.bio = profile.bio;
            public.preferences = profile.preferences;
            public.created_at = profile.created_at;
        }
        public
    }
}

/// `GET /api/users/{userId}/conversations`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConversationsResponse {
    pub conversations: Vec<Value>,
    pub total: usize,
    pub other_user: String,
}

/// `PUT /api/users/{userId}/status`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub uid: String,
    pub online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// `POST /api/users/batch-update`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    pub success: bool,
    pub updated_count: usize,
}

/// `GET /api/chat/conversations`
#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
    pub total: usize,
}

/// `GET /api/channels/public`
#[derive(Debug, Serialize)]
pub struct PublicChannelsResponse {
    pub channels: Vec<ChannelSummary>,
    pub total: usize,
    pub search: Option<String>,
}

/// `GET /api/channels/search`
#[derive(Debug, Serialize)]
pub struct SearchChannelsResponse {
    pub channels: Vec<ChannelSummary>,
    pub total: usize,
    pub query: String,
}

/// `GET /api/channels/trending`
#[derive(Debug, Serialize)]
pub struct TrendingChannelsResponse {
    pub channels: Vec<ChannelSummary>,
    pub total: usize,
    pub timeframe: Timeframe,
}

/// `GET /api/channels/{channelId}/messages`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessagesResponse<M: Serialize> {
    pub messages: Vec<M>,
    pub total: usize,
    pub channel_id: String,
}

/// `GET /api/config/maps-key`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsKeyResponse {
    pub google_api_key: String,
}

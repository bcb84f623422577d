//! Request DTOs
//!
//! Bodies and query strings accepted by the API. String fields are trimmed by
//! the handlers before they reach a service.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::application::services::Timeframe;
use crate::domain::providers::{ChannelKind, Document, UserDeletion};
use crate::domain::UserRole;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

fn must_be_true(value: &bool) -> Result<(), ValidationError> {
    if !value {
        return Err(ValidationError::new("confirm").with_message("must be true".into()));
    }
    Ok(())
}

fn no_blank_ids(ids: &[String]) -> Result<(), ValidationError> {
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ValidationError::new("blank_id").with_message("must not contain empty ids".into()));
    }
    Ok(())
}

/// Chat token options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenOptions {
    /// Expiry as unix seconds
    pub exp: Option<i64>,
}

/// Login request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub user_data: Option<Map<String, Value>>,
    #[serde(default)]
    pub token_options: Option<TokenOptions>,
}

/// Chat token refresh request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub token_options: Option<TokenOptions>,
}

/// Profile update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,

    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    pub preferences: Option<Map<String, Value>>,

    pub role: Option<UserRole>,
}

impl UpdateProfileRequest {
    /// Present fields as a profile document.
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        if let Some(name) = self.name {
            doc.insert("name".into(), Value::String(name.trim().to_owned()));
        }
        if let Some(image) = self.image {
            doc.insert("image".into(), Value::String(image));
        }
        if let Some(bio) = self.bio {
            doc.insert("bio".into(), Value::String(bio.trim().to_owned()));
        }
        if let Some(preferences) = self.preferences {
            doc.insert("preferences".into(), Value::Object(preferences));
        }
        if let Some(role) = self.role {
            doc.insert("role".into(), Value::String(role.as_str().to_owned()));
        }
        doc
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    pub mark_messages_deleted: Option<bool>,
    pub hard_delete: Option<bool>,
}

impl From<DeleteOptions> for UserDeletion {
    fn from(options: DeleteOptions) -> Self {
        let defaults = UserDeletion::default();
        Self {
            mark_messages_deleted: options.mark_messages_deleted.unwrap_or(defaults.mark_messages_deleted),
            hard_delete: options.hard_delete.unwrap_or(defaults.hard_delete),
        }
    }
}

/// Account deletion request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    #[serde(default)]
    #[validate(custom(function = "must_be_true"))]
    pub confirm_delete: bool,
    #[serde(default)]
    pub delete_options: Option<DeleteOptions>,
}

/// `GET /api/users/search`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchUsersQuery {
    #[validate(
        length(min = 1, max = 100, message = "Query must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub q: Option<String>,

    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u32>,

    pub role: Option<UserRole>,

    pub online: Option<bool>,
}

/// `GET /api/users/online`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct OnlineUsersQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

/// Presence update
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub online: Option<bool>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// `POST /api/users/batch-update`; `updates` is checked to be an array by the handler.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct BatchUpdateRequest {
    #[serde(default)]
    pub updates: Value,
}

/// `GET /api/chat/conversations`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConversationsQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub include_stream: Option<bool>,
}

/// Direct message request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectMessageRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub other_user_id: String,

    #[validate(length(max = 1000, message = "Message must be at most 1000 characters"))]
    pub message: Option<String>,
}

/// Group channel request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one member is required"),
        custom(function = "no_blank_ids")
    )]
    pub members: Vec<String>,

    pub is_private: Option<bool>,

    pub allow_member_invites: Option<bool>,
}

/// Channel update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateChannelRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub settings: Option<Map<String, Value>>,
}

impl UpdateChannelRequest {
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        if let Some(name) = self.name {
            doc.insert("name".into(), Value::String(name.trim().to_owned()));
        }
        if let Some(description) = self.description {
            doc.insert("description".into(), Value::String(description.trim().to_owned()));
        }
        if let Some(settings) = self.settings {
            doc.insert("settings".into(), Value::Object(settings));
        }
        doc
    }
}

/// Channel deletion request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChannelRequest {
    #[serde(default)]
    pub hard_delete: bool,
}

/// Member add/remove request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MembersRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one member id is required"),
        custom(function = "no_blank_ids")
    )]
    pub member_ids: Vec<String>,
}

/// `GET /api/chat/channel/{channelId}/analytics`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// `GET /api/channels/public`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PublicChannelsQuery {
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u32>,

    #[validate(
        length(min = 1, max = 100, message = "Search must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub search: Option<String>,
}

/// `GET /api/channels/{channelId}/members`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChannelMembersQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// `GET /api/channels/{channelId}/messages`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChannelMessagesQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,

    /// Only messages older than this message id
    pub before: Option<String>,

    /// Only messages newer than this message id
    pub after: Option<String>,
}

/// `GET /api/channels/search`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchChannelsQuery {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 100, message = "Query must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub q: String,

    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u32>,

    #[serde(rename = "type")]
    pub kind: Option<ChannelKind>,
}

/// `GET /api/channels/trending`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TrendingChannelsQuery {
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u32>,

    #[serde(default)]
    pub timeframe: Timeframe,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_group_name_is_rejected() {
        let request: CreateGroupRequest =
            serde_json::from_value(json!({"name": "   ", "members": ["u2"]})).unwrap();

        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn group_requires_members() {
        let request: CreateGroupRequest = serde_json::from_value(json!({"name": "Hikers", "members": []})).unwrap();

        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("members"));
    }

    #[test]
    fn delete_account_requires_confirmation() {
        let request: DeleteAccountRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.validate().is_err());

        let request: DeleteAccountRequest =
            serde_json::from_value(json!({"confirmDelete": true, "deleteOptions": {"hardDelete": true}})).unwrap();
        assert!(request.validate().is_ok());
        let options: UserDeletion = request.delete_options.unwrap_or_default().into();
        assert!(options.hard_delete);
        assert!(options.mark_messages_deleted);
    }

    #[test]
    fn profile_update_keeps_only_present_fields() {
        let request: UpdateProfileRequest =
            serde_json::from_value(json!({"name": "  Ana Pop ", "role": "moderator"})).unwrap();
        assert!(request.validate().is_ok());

        let doc = request.into_document();
        assert_eq!(doc.get("name"), Some(&json!("Ana Pop")));
        assert_eq!(doc.get("role"), Some(&json!("moderator")));
        assert!(!doc.contains_key("bio"));
    }

    #[test]
    fn profile_image_must_be_url() {
        let request: UpdateProfileRequest = serde_json::from_value(json!({"image": "not a url"})).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn search_type_accepts_provider_kinds() {
        let query: SearchChannelsQuery = serde_json::from_value(json!({"q": "hik", "type": "team"})).unwrap();
        assert_eq!(query.kind, Some(ChannelKind::Team));
        assert!(serde_json::from_value::<SearchChannelsQuery>(json!({"q": "hik", "type": "livestream"})).is_err());
    }
}

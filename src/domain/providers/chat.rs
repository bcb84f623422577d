//! Chat provider port (Stream Chat).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provider-side channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Messaging,
    Team,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Messaging => "messaging",
            ChannelKind::Team => "team",
        }
    }

    pub fn cid(&self, id: &str) -> String {
        format!("{}:{}", self.as_str(), id)
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record at the chat provider. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatUser {
    /// Build a user from a flat JSON object; `id` is forced to `id`.
    pub fn from_fields(id: &str, mut fields: Map<String, Value>) -> Self {
        fields.insert("id".into(), Value::String(id.to_owned()));
        serde_json::from_value(Value::Object(fields)).unwrap_or_else(|_| ChatUser {
            id: id.to_owned(),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMember {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ChatUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ChatUser>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attachments: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Channel as seen by the chat provider, with member state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub cid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub members: Vec<ChatMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<ChatMessage>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatChannel {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Input for [`ChatProvider::create_channel`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub kind: ChannelKind,
    pub id: String,
    pub created_by: String,
    pub members: Vec<String>,
    /// Custom channel data (name, description, private, ...)
    pub data: Map<String, Value>,
}

/// Channel filter; all present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelFilter {
    pub kind: Option<ChannelKind>,
    pub member: Option<String>,
    /// Prefix match on the channel name
    pub name_autocomplete: Option<String>,
    /// Prefix match on name or description
    pub text_autocomplete: Option<String>,
    pub last_message_after: Option<DateTime<Utc>>,
}

/// Channel listing request, always sorted by last message descending.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelQuery {
    pub filter: ChannelFilter,
    pub limit: usize,
    pub presence: bool,
    /// User whose read state populates `unread_count`
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePage {
    pub limit: usize,
    pub id_lt: Option<String>,
    pub id_gt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserDeletion {
    pub mark_messages_deleted: bool,
    pub hard_delete: bool,
}

impl Default for UserDeletion {
    fn default() -> Self {
        Self {
            mark_messages_deleted: true,
            hard_delete: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatProviderError {
    #[error("Chat resource not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Api { status: u16, code: i64, message: String },

    #[error("Chat provider unreachable: {0}")]
    Transport(String),

    #[error("Unexpected chat provider response: {0}")]
    Decode(String),

    #[error("Failed to sign chat token: {0}")]
    Token(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn upsert_user(&self, user: &ChatUser) -> Result<ChatUser, ChatProviderError>;

    /// Set the given top-level fields on an existing user.
    async fn partial_update_user(
        &self,
        id: &str,
        set: Map<String, Value>,
    ) -> Result<(), ChatProviderError>;

    async fn get_user(&self, id: &str) -> Result<Option<ChatUser>, ChatProviderError>;

    async fn delete_user(&self, id: &str, options: UserDeletion) -> Result<(), ChatProviderError>;

    /// Client token for `user_id`, optionally expiring at `expires_at` (unix seconds).
    fn create_token(&self, user_id: &str, expires_at: Option<i64>) -> Result<String, ChatProviderError>;

    async fn create_channel(&self, channel: NewChannel) -> Result<ChatChannel, ChatProviderError>;

    async fn get_channel(
        &self,
        kind: ChannelKind,
        id: &str,
    ) -> Result<Option<ChatChannel>, ChatProviderError>;

    async fn update_channel(
        &self,
        kind: ChannelKind,
        id: &str,
        set: Map<String, Value>,
    ) -> Result<(), ChatProviderError>;

    async fn delete_channel(&self, kind: ChannelKind, id: &str, hard: bool) -> Result<(), ChatProviderError>;

    async fn add_members(
        &self,
        kind: ChannelKind,
        id: &str,
        members: &[String],
    ) -> Result<(), ChatProviderError>;

    async fn remove_members(
        &self,
        kind: ChannelKind,
        id: &str,
        members: &[String],
    ) -> Result<(), ChatProviderError>;

    async fn query_channels(&self, query: &ChannelQuery) -> Result<Vec<ChatChannel>, ChatProviderError>;

    async fn query_messages(
        &self,
        kind: ChannelKind,
        id: &str,
        page: &MessagePage,
    ) -> Result<Vec<ChatMessage>, ChatProviderError>;

    /// Cheap authenticated call used by readiness checks.
    async fn ping(&self) -> Result<(), ChatProviderError>;
}

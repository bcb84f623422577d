//! Chat Service
//!
//! Direct-message and group channels live in two places: the chat provider
//! holds members and messages, the `channels` collection holds app metadata
//! (admins, invite settings, soft-delete flag). Mutations update the provider
//! first and the record second, without rollback.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use serde::{ser::Error as _, Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::domain::providers::{
    timestamp_value, ChannelFilter, ChannelKind, ChannelQuery, ChatChannel, ChatMember, ChatMessage, ChatProvider,
    ChatProviderError, Document, DocumentStore, DocumentStoreError, MessagePage, NewChannel, Query, MAX_IN_VALUES,
};
use crate::domain::services::ChannelPolicy;
use crate::domain::{
    dm_channel_id, group_channel_id, merge_members, ChannelRecord, ChannelSettings, ChannelType, CHANNELS_COLLECTION,
};

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Get or create the DM channel between `user_a` (creator) and `user_b`.
    async fn create_direct_message(
        &self,
        user_a: &str,
        user_b: &str,
        options: DirectMessageOptions,
    ) -> Result<ChannelCreated, ChatError>;

    async fn create_group_channel(
        &self,
        creator: &str,
        members: Vec<String>,
        name: &str,
        options: GroupOptions,
    ) -> Result<ChannelCreated, ChatError>;

    async fn get_user_conversations(
        &self,
        uid: &str,
        options: ConversationOptions,
    ) -> Result<Vec<Conversation>, ChatError>;

    async fn add_members_to_channel(
        &self,
        channel_id: &str,
        member_ids: Vec<String>,
        actor: &str,
    ) -> Result<MembersAdded, ChatError>;

    async fn remove_members_from_channel(
        &self,
        channel_id: &str,
        member_ids: Vec<String>,
        actor: &str,
    ) -> Result<MembersRemoved, ChatError>;

    async fn update_channel(&self, channel_id: &str, updates: Document, actor: &str) -> Result<ChannelUpdated, ChatError>;

    async fn delete_channel(&self, channel_id: &str, actor: &str, hard_delete: bool) -> Result<ChannelDeleted, ChatError>;

    /// Stored channel record, if any.
    async fn find_channel(&self, channel_id: &str) -> Result<Option<ChannelRecord>, ChatError>;

    /// Stored channel record; `viewer` must be a member.
    async fn get_channel(&self, channel_id: &str, viewer: &str) -> Result<ChannelRecord, ChatError>;

    async fn channel_analytics(
        &self,
        channel_id: &str,
        viewer: &str,
        range: AnalyticsRange,
    ) -> Result<ChannelAnalytics, ChatError>;

    /// Public team channels `uid` has not joined.
    async fn public_channels(
        &self,
        uid: &str,
        search: Option<String>,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChatError>;

    async fn join_channel(&self, uid: &str, channel_id: &str) -> Result<JoinedChannel, ChatError>;

    async fn leave_channel(&self, uid: &str, channel_id: &str) -> Result<LeftChannel, ChatError>;

    async fn channel_members(
        &self,
        uid: &str,
        channel_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<MemberPage, ChatError>;

    async fn channel_messages(
        &self,
        uid: &str,
        channel_id: &str,
        page: MessagePage,
    ) -> Result<Vec<MessageView>, ChatError>;

    /// Channels `uid` belongs to whose name or description starts with `query`.
    async fn search_channels(
        &self,
        uid: &str,
        query: &str,
        kind: Option<ChannelKind>,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChatError>;

    async fn trending_channels(
        &self,
        uid: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChatError>;
}

#[derive(Debug, Clone, Default)]
pub struct DirectMessageOptions {
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroupOptions {
    pub description: Option<String>,
    pub is_private: bool,
    pub allow_member_invites: bool,
    /// Extra settings stored alongside the two flags
    pub settings: Map<String, Value>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            description: None,
            is_private: false,
            allow_member_invites: true,
            settings: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConversationOptions {
    pub limit: usize,
    pub include_stream: bool,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            limit: 30,
            include_stream: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Look-back window for trending channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            Timeframe::Day => Duration::hours(24),
            Timeframe::Week => Duration::days(7),
            Timeframe::Month => Duration::days(30),
        }
    }
}

/// A created (or already existing) channel record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCreated {
    #[serde(flatten)]
    pub record: ChannelRecord,
    /// Provider channel; absent when the record already existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_channel: Option<ChatChannel>,
}

/// Provider channel merged with its stored record.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub record: Option<ChannelRecord>,
    pub stream_channel: ChatChannel,
    pub last_message: Option<DateTime<Utc>>,
    pub unread_count: u32,
    pub members: Vec<ChatMember>,
}

impl Serialize for Conversation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Provider members replace the stored uid list.
        let mut doc = self.record.as_ref().map(ChannelRecord::to_document).unwrap_or_default();
        let stream_channel = serde_json::to_value(&self.stream_channel).map_err(S::Error::custom)?;
        let members = serde_json::to_value(&self.members).map_err(S::Error::custom)?;
        doc.insert("streamChannel".into(), stream_channel);
        doc.insert("lastMessage".into(), timestamp_or_null(self.last_message));
        doc.insert("unreadCount".into(), Value::from(self.unread_count));
        doc.insert("members".into(), members);
        doc.serialize(serializer)
    }
}

fn timestamp_or_null(at: Option<DateTime<Utc>>) -> Value {
    at.map(timestamp_value).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersAdded {
    pub success: bool,
    pub channel_id: String,
    pub added_members: Vec<String>,
    pub total_members: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersRemoved {
    pub success: bool,
    pub channel_id: String,
    pub removed_members: Vec<String>,
    pub total_members: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUpdated {
    pub success: bool,
    pub channel_id: String,
    pub updates: Document,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDeleted {
    pub success: bool,
    pub channel_id: String,
    pub hard_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAnalytics {
    pub channel_id: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub member_count: usize,
    pub message_count: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Channel listing entry for discovery and search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub member_count: usize,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
}

impl ChannelSummary {
    fn from_channel(channel: &ChatChannel) -> Self {
        Self {
            id: channel.id.clone(),
            kind: None,
            name: channel.name.clone(),
            description: channel.description.clone(),
            member_count: channel.member_count(),
            last_message_at: channel.last_message_at,
            image: None,
            created_by: None,
            unread_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedChannel {
    pub channel_id: String,
    pub joined: bool,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftChannel {
    pub channel_id: String,
    pub left: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub uid: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub online: Option<bool>,
}

impl From<&ChatMember> for MemberView {
    fn from(member: &ChatMember) -> Self {
        let user = member.user.as_ref();
        Self {
            uid: member.user_id.clone(),
            name: user.and_then(|u| u.name.clone()),
            image: user.and_then(|u| u.image.clone()),
            role: member.role.clone(),
            joined_at: member.created_at,
            online: user.and_then(|u| u.online),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPage {
    pub members: Vec<MemberView>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub channel_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageAuthor {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub text: String,
    pub user: Option<MessageAuthor>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub attachments: Vec<Value>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<ChatMessage> for MessageView {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            text: message.text,
            user: message.user.map(|u| MessageAuthor {
                id: u.id,
                name: u.name,
                image: u.image,
            }),
            created_at: message.created_at,
            updated_at: message.updated_at,
            attachments: message.attachments,
            kind: message.kind,
        }
    }
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error(transparent)]
    Store(#[from] DocumentStoreError),

    #[error(transparent)]
    Chat(#[from] ChatProviderError),
}

impl ChatError {
    fn channel_not_found() -> Self {
        ChatError::NotFound("Channel not found".into())
    }

    fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        ChatError::Forbidden {
            code,
            message: message.into(),
        }
    }

    fn access_denied() -> Self {
        Self::forbidden("ACCESS_DENIED", "Access denied")
    }
}

/// ChatService implementation
pub struct ChatServiceImpl {
    store: Arc<dyn DocumentStore>,
    chat: Arc<dyn ChatProvider>,
}

impl ChatServiceImpl {
    pub fn new(store: Arc<dyn DocumentStore>, chat: Arc<dyn ChatProvider>) -> Self {
        Self { store, chat }
    }

    async fn load_channel(&self, channel_id: &str) -> Result<ChannelRecord, ChatError> {
        self.find_channel(channel_id).await?.ok_or_else(ChatError::channel_not_found)
    }

    async fn write_channel(&self, channel_id: &str, mut data: Document) -> Result<(), ChatError> {
        data.insert("updatedAt".into(), timestamp_value(Utc::now()));
        match self.store.update(CHANNELS_COLLECTION, channel_id, data).await {
            Ok(()) => Ok(()),
            Err(DocumentStoreError::NotFound { .. }) => Err(ChatError::channel_not_found()),
            Err(err) => {
                error!(channel_id, error = %err, "Failed to update channel record");
                Err(err.into())
            }
        }
    }

    /// Provider team channel that `uid` must belong to.
    async fn member_channel(&self, uid: &str, channel_id: &str) -> Result<ChatChannel, ChatError> {
        let channel = self
            .chat
            .get_channel(ChannelKind::Team, channel_id)
            .await?
            .ok_or_else(ChatError::channel_not_found)?;
        if !channel.has_member(uid) {
            return Err(ChatError::access_denied());
        }
        Ok(channel)
    }

    /// Reflect a join or leave in the stored record, when there is one.
    async fn mirror_membership(&self, channel_id: &str, uid: &str, joined: bool) -> Result<(), ChatError> {
        let record = self.load_channel(channel_id).await?;
        let members = if joined {
            merge_members(&record.members, &[uid.to_owned()])
        } else {
            record.members.into_iter().filter(|m| m != uid).collect()
        };
        let mut data = Document::new();
        data.insert("members".into(), Value::from(members));
        self.write_channel(channel_id, data).await
    }

    async fn query_channels(&self, filter: ChannelFilter, limit: usize, user_id: Option<&str>) -> Result<Vec<ChatChannel>, ChatError> {
        let query = ChannelQuery {
            filter,
            limit,
            presence: true,
            user_id: user_id.map(str::to_owned),
        };
        Ok(self.chat.query_channels(&query).await?)
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn create_direct_message(
        &self,
        user_a: &str,
        user_b: &str,
        options: DirectMessageOptions,
    ) -> Result<ChannelCreated, ChatError> {
        if user_a == user_b {
            return Err(ChatError::Invalid("Cannot create DM channel with yourself".into()));
        }

        let channel_id = dm_channel_id(user_a, user_b);
        if let Some(record) = self.find_channel(&channel_id).await? {
            return Ok(ChannelCreated {
                record,
                stream_channel: None,
            });
        }

        let members = vec![user_a.to_owned(), user_b.to_owned()];
        let mut data = Map::new();
        data.insert("name".into(), Value::String(format!("{user_a}_{user_b}")));
        if let Some(text) = options.initial_message.filter(|t| !t.trim().is_empty()) {
            data.insert("initialMessage".into(), Value::String(text));
        }

        let stream_channel = self
            .chat
            .create_channel(NewChannel {
                kind: ChannelKind::Messaging,
                id: channel_id.clone(),
                created_by: user_a.to_owned(),
                members: members.clone(),
                data,
            })
            .await
            .inspect_err(|e| error!(channel_id = %channel_id, error = %e, "Chat channel creation failed"))?;

        let now = Utc::now();
        let record = ChannelRecord {
            id: channel_id.clone(),
            channel_type: ChannelType::DirectMessage,
            name: None,
            description: None,
            members,
            admins: Vec::new(),
            created_by: user_a.to_owned(),
            created_at: Some(now),
            updated_at: Some(now),
            last_message_at: None,
            message_count: 0,
            stream_channel_id: channel_id.clone(),
            settings: None,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            updated_by: None,
        };
        self.store
            .set(CHANNELS_COLLECTION, &channel_id, record.to_document(), false)
            .await
            .inspect_err(|e| error!(channel_id = %channel_id, error = %e, "Failed to store channel record"))?;

        info!(channel_id = %channel_id, "Direct message channel created");
        Ok(ChannelCreated {
            record,
            stream_channel: Some(stream_channel),
        })
    }

    async fn create_group_channel(
        &self,
        creator: &str,
        members: Vec<String>,
        name: &str,
        options: GroupOptions,
    ) -> Result<ChannelCreated, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::Invalid("Channel name is required".into()));
        }

        let now = Utc::now();
        let channel_id = group_channel_id(now, &mut rand::rng());
        let members = merge_members(&[creator.to_owned()], &members);
        let description = options.description.unwrap_or_default();

        let mut data = Map::new();
        data.insert("name".into(), Value::String(name.to_owned()));
        data.insert("description".into(), Value::String(description.clone()));
        data.insert("private".into(), Value::Bool(options.is_private));

        let stream_channel = self
            .chat
            .create_channel(NewChannel {
                kind: ChannelKind::Team,
                id: channel_id.clone(),
                created_by: creator.to_owned(),
                members: members.clone(),
                data,
            })
            .await
            .inspect_err(|e| error!(channel_id = %channel_id, error = %e, "Chat channel creation failed"))?;

        let record = ChannelRecord {
            id: channel_id.clone(),
            channel_type: ChannelType::Group,
            name: Some(name.to_owned()),
            description: Some(description),
            members,
            admins: vec![creator.to_owned()],
            created_by: creator.to_owned(),
            created_at: Some(now),
            updated_at: Some(now),
            last_message_at: None,
            message_count: 0,
            stream_channel_id: channel_id.clone(),
            settings: Some(ChannelSettings {
                allow_member_invites: options.allow_member_invites,
                is_private: options.is_private,
                extra: options.settings,
            }),
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            updated_by: None,
        };
        self.store
            .set(CHANNELS_COLLECTION, &channel_id, record.to_document(), false)
            .await
            .inspect_err(|e| error!(channel_id = %channel_id, error = %e, "Failed to store channel record"))?;

        info!(channel_id = %channel_id, members = record.members.len(), "Group channel created");
        Ok(ChannelCreated {
            record,
            stream_channel: Some(stream_channel),
        })
    }

    async fn get_user_conversations(
        &self,
        uid: &str,
        options: ConversationOptions,
    ) -> Result<Vec<Conversation>, ChatError> {
        if !options.include_stream {
            return Ok(Vec::new());
        }

        let filter = ChannelFilter {
            member: Some(uid.to_owned()),
            ..Default::default()
        };
        let channels = self.query_channels(filter, options.limit, Some(uid)).await?;

        let ids: Vec<Value> = channels.iter().map(|c| Value::String(c.id.clone())).collect();
        let queries: Vec<Query> = ids
            .chunks(MAX_IN_VALUES)
            .map(|chunk| Query::collection(CHANNELS_COLLECTION).where_in("id", chunk.to_vec()))
            .collect();
        let pages = try_join_all(queries.iter().map(|query| self.store.query(query))).await?;

        let mut records: HashMap<String, ChannelRecord> = HashMap::new();
        for doc in pages.into_iter().flatten() {
            match ChannelRecord::from_document(&doc.id, doc.data) {
                Ok(record) => {
                    records.insert(record.id.clone(), record);
                }
                Err(err) => warn!(channel_id = %doc.id, error = %err, "Skipping malformed channel record"),
            }
        }

        let mut conversations: Vec<Conversation> = channels
            .into_iter()
            .map(|channel| Conversation {
                record: records.remove(&channel.id),
                last_message: channel.last_message_at,
                unread_count: channel.unread_count,
                members: channel.members.clone(),
                stream_channel: channel,
            })
            .collect();
        conversations.sort_by(|a, b| b.last_message.cmp(&a.last_message));

        Ok(conversations)
    }

    async fn add_members_to_channel(
        &self,
        channel_id: &str,
        member_ids: Vec<String>,
        actor: &str,
    ) -> Result<MembersAdded, ChatError> {
        if member_ids.is_empty() {
            return Err(ChatError::Invalid("At least one member is required".into()));
        }

        let channel = self.load_channel(channel_id).await?;
        if !ChannelPolicy::can_add_members(&channel, actor) {
            return Err(ChatError::forbidden(
                "ACCESS_DENIED",
                "Only admins can add members to this channel",
            ));
        }

        self.chat
            .add_members(channel.provider_kind(), channel_id, &member_ids)
            .await
            .inspect_err(|e| error!(channel_id, error = %e, "Adding chat members failed"))?;

        let members = merge_members(&channel.members, &member_ids);
        let total_members = members.len();
        let mut data = Document::new();
        data.insert("members".into(), Value::from(members));
        self.write_channel(channel_id, data).await?;

        Ok(MembersAdded {
            success: true,
            channel_id: channel_id.to_owned(),
            added_members: member_ids,
            total_members,
        })
    }

    async fn remove_members_from_channel(
        &self,
        channel_id: &str,
        member_ids: Vec<String>,
        actor: &str,
    ) -> Result<MembersRemoved, ChatError> {
        if member_ids.is_empty() {
            return Err(ChatError::Invalid("At least one member is required".into()));
        }

        let channel = self.load_channel(channel_id).await?;
        if !ChannelPolicy::can_remove_members(&channel, actor, &member_ids) {
            return Err(ChatError::forbidden(
                "ACCESS_DENIED",
                "Only admins can remove members from this channel",
            ));
        }

        self.chat
            .remove_members(channel.provider_kind(), channel_id, &member_ids)
            .await
            .inspect_err(|e| error!(channel_id, error = %e, "Removing chat members failed"))?;

        let members: Vec<String> = channel
            .members
            .into_iter()
            .filter(|m| !member_ids.contains(m))
            .collect();
        let total_members = members.len();
        let mut data = Document::new();
        data.insert("members".into(), Value::from(members));
        self.write_channel(channel_id, data).await?;

        Ok(MembersRemoved {
            success: true,
            channel_id: channel_id.to_owned(),
            removed_members: member_ids,
            total_members,
        })
    }

    async fn update_channel(&self, channel_id: &str, updates: Document, actor: &str) -> Result<ChannelUpdated, ChatError> {
        let channel = self.load_channel(channel_id).await?;
        if !ChannelPolicy::can_update(&channel, actor) {
            return Err(ChatError::forbidden("ACCESS_DENIED", "Only admins can update this channel"));
        }

        let provider_fields: Map<String, Value> = ["name", "description"]
            .into_iter()
            .filter_map(|field| {
                updates
                    .get(field)
                    .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                    .map(|v| (field.to_owned(), v.clone()))
            })
            .collect();
        if !provider_fields.is_empty() {
            self.chat
                .update_channel(channel.provider_kind(), channel_id, provider_fields)
                .await
                .inspect_err(|e| error!(channel_id, error = %e, "Chat channel update failed"))?;
        }

        let mut data = updates;
        data.insert("updatedAt".into(), timestamp_value(Utc::now()));
        data.insert("updatedBy".into(), Value::String(actor.to_owned()));
        self.write_channel(channel_id, data.clone()).await?;

        Ok(ChannelUpdated {
            success: true,
            channel_id: channel_id.to_owned(),
            updates: data,
        })
    }

    async fn delete_channel(&self, channel_id: &str, actor: &str, hard_delete: bool) -> Result<ChannelDeleted, ChatError> {
        let channel = self.load_channel(channel_id).await?;
        if !ChannelPolicy::can_delete(&channel, actor) {
            return Err(ChatError::forbidden(
                "ACCESS_DENIED",
                "Only channel creator or admins can delete this channel",
            ));
        }

        if hard_delete {
            self.chat
                .delete_channel(channel.provider_kind(), channel_id, true)
                .await
                .inspect_err(|e| error!(channel_id, error = %e, "Chat channel deletion failed"))?;
            self.store.delete(CHANNELS_COLLECTION, channel_id).await?;
        } else {
            let mut data = Document::new();
            data.insert("deleted".into(), Value::Bool(true));
            data.insert("deletedAt".into(), timestamp_value(Utc::now()));
            data.insert("deletedBy".into(), Value::String(actor.to_owned()));
            self.write_channel(channel_id, data).await?;
        }

        info!(channel_id, hard_delete, "Channel deleted");
        Ok(ChannelDeleted {
            success: true,
            channel_id: channel_id.to_owned(),
            hard_deleted: hard_delete,
        })
    }

    async fn find_channel(&self, channel_id: &str) -> Result<Option<ChannelRecord>, ChatError> {
        let Some(doc) = self.store.get(CHANNELS_COLLECTION, channel_id).await? else {
            return Ok(None);
        };
        ChannelRecord::from_document(channel_id, doc)
            .map(Some)
            .map_err(|e| DocumentStoreError::Codec(format!("channel {channel_id}: {e}")).into())
    }

    async fn get_channel(&self, channel_id: &str, viewer: &str) -> Result<ChannelRecord, ChatError> {
        let channel = self.load_channel(channel_id).await?;
        if !channel.is_member(viewer) {
            return Err(ChatError::access_denied());
        }
        Ok(channel)
    }

    async fn channel_analytics(
        &self,
        channel_id: &str,
        viewer: &str,
        range: AnalyticsRange,
    ) -> Result<ChannelAnalytics, ChatError> {
        let channel = self.get_channel(channel_id, viewer).await?;

        Ok(ChannelAnalytics {
            channel_id: channel.id,
            channel_type: channel.channel_type,
            member_count: channel.members.len(),
            message_count: channel.message_count,
            created_at: channel.created_at,
            last_message_at: channel.last_message_at,
            start_date: range.start,
            end_date: range.end,
        })
    }

    async fn public_channels(
        &self,
        uid: &str,
        search: Option<String>,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChatError> {
        let filter = ChannelFilter {
            kind: Some(ChannelKind::Team),
            name_autocomplete: search,
            ..Default::default()
        };
        let channels = self.query_channels(filter, limit, None).await?;

        Ok(channels
            .iter()
            .filter(|c| !c.private && !c.has_member(uid))
            .map(|c| ChannelSummary {
                image: c.image.clone(),
                created_by: c.created_by_id.clone(),
                ..ChannelSummary::from_channel(c)
            })
            .collect())
    }

    async fn join_channel(&self, uid: &str, channel_id: &str) -> Result<JoinedChannel, ChatError> {
        let channel = self
            .chat
            .get_channel(ChannelKind::Team, channel_id)
            .await?
            .ok_or_else(ChatError::channel_not_found)?;
        if channel.private {
            return Err(ChatError::forbidden("PRIVATE_CHANNEL", "Cannot join private channel"));
        }

        self.chat
            .add_members(ChannelKind::Team, channel_id, &[uid.to_owned()])
            .await
            .inspect_err(|e| error!(channel_id, uid, error = %e, "Joining chat channel failed"))?;

        if let Err(err) = self.mirror_membership(channel_id, uid, true).await {
            warn!(channel_id, uid, error = %err, "Channel record not updated after join");
        }

        let member_count = channel.member_count() + usize::from(!channel.has_member(uid));
        Ok(JoinedChannel {
            channel_id: channel_id.to_owned(),
            joined: true,
            member_count,
        })
    }

    async fn leave_channel(&self, uid: &str, channel_id: &str) -> Result<LeftChannel, ChatError> {
        self.chat
            .remove_members(ChannelKind::Team, channel_id, &[uid.to_owned()])
            .await
            .inspect_err(|e| error!(channel_id, uid, error = %e, "Leaving chat channel failed"))?;

        if let Err(err) = self.mirror_membership(channel_id, uid, false).await {
            warn!(channel_id, uid, error = %err, "Channel record not updated after leave");
        }

        Ok(LeftChannel {
            channel_id: channel_id.to_owned(),
            left: true,
        })
    }

    async fn channel_members(
        &self,
        uid: &str,
        channel_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<MemberPage, ChatError> {
        let channel = self.member_channel(uid, channel_id).await?;

        Ok(MemberPage {
            members: channel.members.iter().skip(offset).take(limit).map(MemberView::from).collect(),
            total: channel.member_count(),
            offset,
            limit,
            channel_id: channel_id.to_owned(),
        })
    }

    async fn channel_messages(
        &self,
        uid: &str,
        channel_id: &str,
        page: MessagePage,
    ) -> Result<Vec<MessageView>, ChatError> {
        self.member_channel(uid, channel_id).await?;

        let messages = self
            .chat
            .query_messages(ChannelKind::Team, channel_id, &page)
            .await?;
        Ok(messages.into_iter().map(MessageView::from).collect())
    }

    async fn search_channels(
        &self,
        uid: &str,
        query: &str,
        kind: Option<ChannelKind>,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChatError> {
        let filter = ChannelFilter {
            kind,
            member: Some(uid.to_owned()),
            text_autocomplete: Some(query.to_owned()),
            ..Default::default()
        };
        let channels = self.query_channels(filter, limit, Some(uid)).await?;

        Ok(channels
            .iter()
            .map(|c| ChannelSummary {
                kind: Some(c.kind.clone()),
                unread_count: Some(c.unread_count),
                ..ChannelSummary::from_channel(c)
            })
            .collect())
    }

    async fn trending_channels(
        &self,
        uid: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChatError> {
        let filter = ChannelFilter {
            kind: Some(ChannelKind::Team),
            last_message_after: Some(Utc::now() - timeframe.window()),
            ..Default::default()
        };
        let channels = self.query_channels(filter, limit, None).await?;

        Ok(channels
            .iter()
            .filter(|c| !c.private && !c.has_member(uid))
            .map(|c| ChannelSummary {
                image: c.image.clone(),
                ..ChannelSummary::from_channel(c)
            })
            .collect())
    }
}

//! In-process chat provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::domain::providers::{
    ChannelFilter, ChannelKind, ChannelQuery, ChatChannel, ChatMember, ChatMessage, ChatProvider, ChatProviderError,
    ChatUser, MessagePage, NewChannel, UserDeletion,
};
use crate::infrastructure::stream::user_token;

const TOKEN_SECRET: &str = "memory-chat-provider-secret";

struct StoredChannel {
    channel: ChatChannel,
    messages: Vec<ChatMessage>,
}

#[derive(Default)]
pub struct MemoryChatProvider {
    users: RwLock<HashMap<String, ChatUser>>,
    /// Keyed by cid
    channels: RwLock<HashMap<String, StoredChannel>>,
    channel_creations: AtomicUsize,
}

/// Prefix match against the whole value or any of its words.
fn autocomplete(value: Option<&str>, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    value.is_some_and(|v| {
        let v = v.to_lowercase();
        v.starts_with(&needle) || v.split_whitespace().any(|word| word.starts_with(&needle))
    })
}

fn filter_matches(filter: &ChannelFilter, channel: &ChatChannel) -> bool {
    if filter.kind.is_some_and(|k| k.as_str() != channel.kind) {
        return false;
    }
    if filter.member.as_deref().is_some_and(|m| !channel.has_member(m)) {
        return false;
    }
    if let Some(name) = &filter.name_autocomplete {
        if !autocomplete(channel.name.as_deref(), name) {
            return false;
        }
    }
    if let Some(text) = &filter.text_autocomplete {
        if !autocomplete(channel.name.as_deref(), text) && !autocomplete(channel.description.as_deref(), text) {
            return false;
        }
    }
    if let Some(after) = filter.last_message_after {
        if channel.last_message_at.is_none_or(|at| at < after) {
            return false;
        }
    }
    true
}

impl MemoryChatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_channel` calls received.
    pub fn channel_creations(&self) -> usize {
        self.channel_creations.load(Ordering::Relaxed)
    }

    /// Append a message as `user_id`, updating the channel's last message.
    pub fn post_message(&self, kind: ChannelKind, id: &str, user_id: &str, text: &str, at: DateTime<Utc>) {
        let user = self.users.read().get(user_id).cloned();
        let mut channels = self.channels.write();
        if let Some(stored) = channels.get_mut(&kind.cid(id)) {
            let message = ChatMessage {
                id: format!("msg_{}", stored.messages.len() + 1),
                text: text.to_owned(),
                user: user.or_else(|| Some(ChatUser { id: user_id.to_owned(), ..Default::default() })),
                kind: "regular".into(),
                attachments: Vec::new(),
                created_at: Some(at),
                updated_at: Some(at),
            };
            stored.channel.last_message_at = Some(at);
            stored.channel.last_message = Some(message.clone());
            stored.messages.push(message);
        }
    }

    fn member(&self, user_id: &str, role: &str) -> ChatMember {
        ChatMember {
            user_id: user_id.to_owned(),
            user: self.users.read().get(user_id).cloned(),
            role: Some(role.to_owned()),
            created_at: Some(Utc::now()),
        }
    }

    fn with_channel<T>(
        &self,
        kind: ChannelKind,
        id: &str,
        f: impl FnOnce(&mut StoredChannel) -> T,
    ) -> Result<T, ChatProviderError> {
        let mut channels = self.channels.write();
        channels
            .get_mut(&kind.cid(id))
            .map(f)
            .ok_or_else(|| ChatProviderError::NotFound(format!("Channel {} does not exist", kind.cid(id))))
    }
}

fn apply_channel_data(channel: &mut ChatChannel, data: &Map<String, Value>) {
    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_owned);
    if let Some(name) = text("name") {
        channel.name = Some(name);
    }
    if let Some(description) = text("description") {
        channel.description = Some(description);
    }
    if let Some(image) = text("image") {
        channel.image = Some(image);
    }
    if let Some(private) = data.get("private").and_then(Value::as_bool) {
        channel.private = private;
    }
}

#[async_trait]
impl ChatProvider for MemoryChatProvider {
    async fn upsert_user(&self, user: &ChatUser) -> Result<ChatUser, ChatProviderError> {
        self.users.write().insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn partial_update_user(&self, id: &str, set: Map<String, Value>) -> Result<(), ChatProviderError> {
        let mut users = self.users.write();
        let user = users
            .get_mut(id)
            .ok_or_else(|| ChatProviderError::NotFound(format!("User {id} does not exist")))?;
        let mut fields = match serde_json::to_value(&*user) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        fields.extend(set);
        *user = ChatUser::from_fields(id, fields);
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<ChatUser>, ChatProviderError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn delete_user(&self, id: &str, options: UserDeletion) -> Result<(), ChatProviderError> {
        if self.users.write().remove(id).is_none() {
            return Err(ChatProviderError::NotFound(format!("User {id} does not exist")));
        }
        if options.mark_messages_deleted || options.hard_delete {
            for stored in self.channels.write().values_mut() {
                stored
                    .messages
                    .retain(|m| m.user.as_ref().is_none_or(|u| u.id != id));
            }
        }
        Ok(())
    }

    fn create_token(&self, user_id: &str, expires_at: Option<i64>) -> Result<String, ChatProviderError> {
        user_token(TOKEN_SECRET, user_id, expires_at)
    }

    async fn create_channel(&self, new: NewChannel) -> Result<ChatChannel, ChatProviderError> {
        self.channel_creations.fetch_add(1, Ordering::Relaxed);
        let cid = new.kind.cid(&new.id);
        if let Some(existing) = self.channels.read().get(&cid) {
            return Ok(existing.channel.clone());
        }

        let members = new
            .members
            .iter()
            .map(|m| self.member(m, if *m == new.created_by { "owner" } else { "member" }))
            .collect();
        let mut channel = ChatChannel {
            id: new.id.clone(),
            kind: new.kind.as_str().to_owned(),
            cid: cid.clone(),
            name: None,
            description: None,
            image: None,
            created_by_id: Some(new.created_by.clone()),
            private: false,
            members,
            last_message_at: None,
            last_message: None,
            unread_count: 0,
            created_at: Some(Utc::now()),
        };
        apply_channel_data(&mut channel, &new.data);

        self.channels.write().insert(
            cid,
            StoredChannel {
                channel: channel.clone(),
                messages: Vec::new(),
            },
        );
        Ok(channel)
    }

    async fn get_channel(&self, kind: ChannelKind, id: &str) -> Result<Option<ChatChannel>, ChatProviderError> {
        Ok(self
            .channels
            .read()
            .get(&kind.cid(id))
            .map(|stored| stored.channel.clone()))
    }

    async fn update_channel(&self, kind: ChannelKind, id: &str, set: Map<String, Value>) -> Result<(), ChatProviderError> {
        self.with_channel(kind, id, |stored| apply_channel_data(&mut stored.channel, &set))
    }

    async fn delete_channel(&self, kind: ChannelKind, id: &str, _hard: bool) -> Result<(), ChatProviderError> {
        self.channels
            .write()
            .remove(&kind.cid(id))
            .map(|_| ())
            .ok_or_else(|| ChatProviderError::NotFound(format!("Channel {} does not exist", kind.cid(id))))
    }

    async fn add_members(&self, kind: ChannelKind, id: &str, members: &[String]) -> Result<(), ChatProviderError> {
        let additions: Vec<ChatMember> = members.iter().map(|m| self.member(m, "member")).collect();
        self.with_channel(kind, id, |stored| {
            for member in additions {
                if !stored.channel.has_member(&member.user_id) {
                    stored.channel.members.push(member);
                }
            }
        })
    }

    async fn remove_members(&self, kind: ChannelKind, id: &str, members: &[String]) -> Result<(), ChatProviderError> {
        self.with_channel(kind, id, |stored| {
            stored.channel.members.retain(|m| !members.contains(&m.user_id));
        })
    }

    async fn query_channels(&self, query: &ChannelQuery) -> Result<Vec<ChatChannel>, ChatProviderError> {
        let mut found: Vec<ChatChannel> = self
            .channels
            .read()
            .values()
            .map(|stored| &stored.channel)
            .filter(|channel| filter_matches(&query.filter, channel))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at).then_with(|| a.id.cmp(&b.id)));
        found.truncate(query.limit);
        Ok(found)
    }

    async fn query_messages(
        &self,
        kind: ChannelKind,
        id: &str,
        page: &MessagePage,
    ) -> Result<Vec<ChatMessage>, ChatProviderError> {
        self.with_channel(kind, id, |stored| {
            let position = |target: &str| stored.messages.iter().position(|m| m.id == target);
            let mut messages: &[ChatMessage] = &stored.messages;
            if let Some(idx) = page.id_lt.as_deref().and_then(position) {
                messages = &messages[..idx];
            }
            if let Some(idx) = page.id_gt.as_deref().and_then(position) {
                let skip = (idx + 1).min(messages.len());
                messages = &messages[skip..];
                return messages.iter().take(page.limit).cloned().collect();
            }
            let start = messages.len().saturating_sub(page.limit);
            messages[start..].to_vec()
        })
    }

    async fn ping(&self) -> Result<(), ChatProviderError> {
        Ok(())
    }
}

//! Stream Chat server-side REST client.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::token::{server_token, user_token};
use crate::config::StreamSettings;
use crate::domain::providers::{
    ChannelFilter, ChannelKind, ChannelQuery, ChatChannel, ChatMember, ChatMessage, ChatProvider, ChatProviderError,
    ChatUser, MessagePage, NewChannel, UserDeletion,
};
use crate::infrastructure::upstream::observe;

const PROVIDER: &str = "stream";

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    cid: String,
    #[serde(default)]
    created_by: Option<ChatUser>,
    #[serde(default)]
    last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    /// Custom channel data (name, description, image, private, ...)
    #[serde(flatten)]
    custom: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ReadState {
    user: ChatUser,
    #[serde(default)]
    unread_messages: u32,
}

#[derive(Debug, Deserialize)]
struct ChannelState {
    channel: RawChannel,
    #[serde(default)]
    members: Vec<ChatMember>,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    read: Vec<ReadState>,
}

impl ChannelState {
    fn into_channel(self, reader: Option<&str>) -> ChatChannel {
        let custom_str = |key: &str| {
            self.channel
                .custom
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        let unread_count = reader
            .and_then(|uid| self.read.iter().find(|r| r.user.id == uid))
            .map(|r| r.unread_messages)
            .unwrap_or_default();

        ChatChannel {
            name: custom_str("name"),
            description: custom_str("description"),
            image: custom_str("image"),
            private: self
                .channel
                .custom
                .get("private")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            id: self.channel.id,
            kind: self.channel.kind,
            cid: self.channel.cid,
            created_by_id: self.channel.created_by.map(|u| u.id),
            members: self.members,
            last_message_at: self.channel.last_message_at,
            last_message: self.messages.into_iter().last(),
            unread_count,
            created_at: self.channel.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    channels: Vec<ChannelState>,
}

#[derive(Debug, Deserialize)]
struct UsersMapResponse {
    #[serde(default)]
    users: HashMap<String, ChatUser>,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    #[serde(default)]
    users: Vec<ChatUser>,
}

#[derive(Debug, Deserialize)]
struct Ignored {}

/// Stream `filter_conditions` for a channel filter.
pub fn filter_conditions(filter: &ChannelFilter) -> Value {
    let mut conditions = Map::new();
    if let Some(kind) = filter.kind {
        conditions.insert("type".into(), json!(kind.as_str()));
    }
    if let Some(member) = &filter.member {
        conditions.insert("members".into(), json!({ "$in": [member] }));
    }
    if let Some(name) = &filter.name_autocomplete {
        conditions.insert("name".into(), json!({ "$autocomplete": name }));
    }
    if let Some(text) = &filter.text_autocomplete {
        conditions.insert(
            "$or".into(),
            json!([
                { "name": { "$autocomplete": text } },
                { "description": { "$autocomplete": text } }
            ]),
        );
    }
    if let Some(after) = filter.last_message_after {
        conditions.insert("last_message_at".into(), json!({ "$gte": after.to_rfc3339() }));
    }
    Value::Object(conditions)
}

pub struct StreamChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    secret: String,
    server_token: String,
}

impl StreamChatClient {
    pub fn new(http: reqwest::Client, settings: &StreamSettings) -> Result<Self, ChatProviderError> {
        if settings.api_key.is_empty() || settings.secret.is_empty() {
            return Err(ChatProviderError::Token("Stream Chat API_KEY and SECRET are required".into()));
        }
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            api_key: settings.api_key.clone(),
            secret: settings.secret.clone(),
            server_token: server_token(&settings.secret)?,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ChatProviderError> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .header(reqwest::header::AUTHORIZATION, &self.server_token)
            .header("stream-auth-type", "jwt");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatProviderError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = if body.message.is_empty() { text } else { body.message };
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ChatProviderError::NotFound(message));
            }
            return Err(ChatProviderError::Api {
                status: status.as_u16(),
                code: body.code,
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChatProviderError::Decode(e.to_string()))
    }

    fn channel_path(kind: ChannelKind, id: &str) -> String {
        format!("/channels/{}/{}", kind.as_str(), id)
    }

    async fn query_channel_states(&self, body: Value) -> Result<Vec<ChannelState>, ChatProviderError> {
        let response: ChannelsResponse = self.call(Method::POST, "/channels", &[], Some(body)).await?;
        Ok(response.channels)
    }
}

#[async_trait]
impl ChatProvider for StreamChatClient {
    async fn upsert_user(&self, user: &ChatUser) -> Result<ChatUser, ChatProviderError> {
        observe(PROVIDER, "upsert_user", async {
            let mut users = Map::new();
            users.insert(user.id.clone(), json!(user));
            let body = json!({ "users": users });
            let mut response: UsersMapResponse = self.call(Method::POST, "/users", &[], Some(body)).await?;
            tracing::debug!(uid = %user.id, "Chat user upserted");
            Ok(response.users.remove(&user.id).unwrap_or_else(|| user.clone()))
        })
        .await
    }

    async fn partial_update_user(&self, id: &str, set: Map<String, Value>) -> Result<(), ChatProviderError> {
        observe(PROVIDER, "partial_update_user", async {
            let body = json!({ "users": [{ "id": id, "set": set }] });
            let _: Ignored = self.call(Method::PATCH, "/users", &[], Some(body)).await?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: &str) -> Result<Option<ChatUser>, ChatProviderError> {
        observe(PROVIDER, "get_user", async {
            let payload = json!({ "filter_conditions": { "id": { "$eq": id } }, "limit": 1 });
            let response: UsersListResponse = self
                .call(Method::GET, "/users", &[("payload", payload.to_string())], None)
                .await?;
            Ok(response.users.into_iter().find(|u| u.id == id))
        })
        .await
    }

    async fn delete_user(&self, id: &str, options: UserDeletion) -> Result<(), ChatProviderError> {
        observe(PROVIDER, "delete_user", async {
            let query = [
                ("mark_messages_deleted", options.mark_messages_deleted.to_string()),
                ("hard_delete", options.hard_delete.to_string()),
            ];
            let _: Ignored = self
                .call(Method::DELETE, &format!("/users/{id}"), &query, None)
                .await?;
            Ok(())
        })
        .await
    }

    fn create_token(&self, user_id: &str, expires_at: Option<i64>) -> Result<String, ChatProviderError> {
        user_token(&self.secret, user_id, expires_at)
    }

    async fn create_channel(&self, channel: NewChannel) -> Result<ChatChannel, ChatProviderError> {
        observe(PROVIDER, "create_channel", async {
            let mut data = channel.data.clone();
            data.insert("created_by_id".into(), json!(channel.created_by));
            data.insert("members".into(), json!(channel.members));
            let body = json!({ "data": data, "state": true });

            let state: ChannelState = self
                .call(
                    Method::POST,
                    &format!("{}/query", Self::channel_path(channel.kind, &channel.id)),
                    &[],
                    Some(body),
                )
                .await?;
            tracing::info!(channel_id = %channel.id, kind = %channel.kind, "Chat channel created");
            Ok(state.into_channel(Some(&channel.created_by)))
        })
        .await
    }

    async fn get_channel(&self, kind: ChannelKind, id: &str) -> Result<Option<ChatChannel>, ChatProviderError> {
        observe(PROVIDER, "get_channel", async {
            let body = json!({
                "filter_conditions": { "cid": kind.cid(id) },
                "state": true,
                "limit": 1
            });
            let states = self.query_channel_states(body).await?;
            Ok(states.into_iter().next().map(|s| s.into_channel(None)))
        })
        .await
    }

    async fn update_channel(&self, kind: ChannelKind, id: &str, set: Map<String, Value>) -> Result<(), ChatProviderError> {
        observe(PROVIDER, "update_channel", async {
            let _: Ignored = self
                .call(Method::PATCH, &Self::channel_path(kind, id), &[], Some(json!({ "set": set })))
                .await?;
            Ok(())
        })
        .await
    }

    async fn delete_channel(&self, kind: ChannelKind, id: &str, hard: bool) -> Result<(), ChatProviderError> {
        observe(PROVIDER, "delete_channel", async {
            let _: Ignored = self
                .call(
                    Method::DELETE,
                    &Self::channel_path(kind, id),
                    &[("hard_delete", hard.to_string())],
                    None,
                )
                .await?;
            Ok(())
        })
        .await
    }

    async fn add_members(&self, kind: ChannelKind, id: &str, members: &[String]) -> Result<(), ChatProviderError> {
        observe(PROVIDER, "add_members", async {
            let _: Ignored = self
                .call(
                    Method::POST,
                    &Self::channel_path(kind, id),
                    &[],
                    Some(json!({ "add_members": members })),
                )
                .await?;
            Ok(())
        })
        .await
    }

    async fn remove_members(&self, kind: ChannelKind, id: &str, members: &[String]) -> Result<(), ChatProviderError> {
        observe(PROVIDER, "remove_members", async {
            let _: Ignored = self
                .call(
                    Method::POST,
                    &Self::channel_path(kind, id),
                    &[],
                    Some(json!({ "remove_members": members })),
                )
                .await?;
            Ok(())
        })
        .await
    }

    async fn query_channels(&self, query: &ChannelQuery) -> Result<Vec<ChatChannel>, ChatProviderError> {
        observe(PROVIDER, "query_channels", async {
            let mut body = json!({
                "filter_conditions": filter_conditions(&query.filter),
                "sort": [{ "field": "last_message_at", "direction": -1 }],
                "limit": query.limit,
                "state": true,
                "presence": query.presence,
            });
            if let Some(user_id) = &query.user_id {
                body["user_id"] = json!(user_id);
            }
            let states = self.query_channel_states(body).await?;
            Ok(states
                .into_iter()
                .map(|s| s.into_channel(query.user_id.as_deref()))
                .collect())
        })
        .await
    }

    async fn query_messages(
        &self,
        kind: ChannelKind,
        id: &str,
        page: &MessagePage,
    ) -> Result<Vec<ChatMessage>, ChatProviderError> {
        observe(PROVIDER, "query_messages", async {
            let mut messages = json!({ "limit": page.limit });
            if let Some(id_lt) = &page.id_lt {
                messages["id_lt"] = json!(id_lt);
            }
            if let Some(id_gt) = &page.id_gt {
                messages["id_gt"] = json!(id_gt);
            }
            let state: ChannelState = self
                .call(
                    Method::POST,
                    &format!("{}/query", Self::channel_path(kind, id)),
                    &[],
                    Some(json!({ "state": true, "messages": messages })),
                )
                .await?;
            Ok(state.messages)
        })
        .await
    }

    async fn ping(&self) -> Result<(), ChatProviderError> {
        observe(PROVIDER, "ping", async {
            let _: Ignored = self.call(Method::GET, "/app", &[], None).await?;
            Ok(())
        })
        .await
    }
}

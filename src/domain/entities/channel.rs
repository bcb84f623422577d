//! Channel metadata stored in the `channels` collection.
//!
//! Each record mirrors a chat-provider channel with the same id. The record
//! holds the app-level data the provider does not: admins, invite settings and
//! the soft-delete flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::providers::{ChannelKind, Document};

pub const CHANNELS_COLLECTION: &str = "channels";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    DirectMessage,
    Group,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::DirectMessage => "direct_message",
            ChannelType::Group => "group",
        }
    }

    /// Channel type used at the chat provider.
    pub fn provider_kind(&self) -> ChannelKind {
        match self {
            ChannelType::DirectMessage => ChannelKind::Messaging,
            ChannelType::Group => ChannelKind::Team,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSettings {
    #[serde(default = "default_true")]
    pub allow_member_invites: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            allow_member_invites: true,
            is_private: false,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admins: Vec<String>,
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub stream_channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ChannelSettings>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl ChannelRecord {
    /// Decode a stored document, using the document id when the body lacks one.
    pub fn from_document(id: &str, mut doc: Document) -> Result<Self, serde_json::Error> {
        doc.entry("id").or_insert_with(|| Value::String(id.to_owned()));
        serde_json::from_value(Value::Object(doc))
    }

    /// Encode for storage.
    pub fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn provider_kind(&self) -> ChannelKind {
        self.channel_type.provider_kind()
    }

    pub fn is_group(&self) -> bool {
        self.channel_type == ChannelType::Group
    }

    pub fn is_member(&self, uid: &str) -> bool {
        self.members.iter().any(|m| m == uid)
    }

    pub fn is_admin(&self, uid: &str) -> bool {
        self.admins.iter().any(|a| a == uid)
    }

    pub fn allows_member_invites(&self) -> bool {
        self.settings.as_ref().is_some_and(|s| s.allow_member_invites)
    }
}

/// Append ids not already present, keeping first-seen order.
pub fn merge_members(existing: &[String], additions: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + additions.len());
    for id in existing.iter().chain(additions) {
        if !merged.contains(id) {
            merged.push(id.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::domain::providers::into_document;

    fn group_doc() -> Document {
        into_document(json!({
            "type": "group",
            "name": "Hikers",
            "members": ["u1", "u2"],
            "admins": ["u1"],
            "createdBy": "u1",
            "createdAt": "2025-03-01T09:00:00Z",
            "lastMessageAt": null,
            "messageCount": 0,
            "streamChannelId": "group_1",
            "settings": {"isPrivate": true, "theme": "green"}
        }))
    }

    #[test]
    fn decodes_group_record_with_defaults() {
        let record = ChannelRecord::from_document("group_1", group_doc()).unwrap();

        assert_eq!(record.id, "group_1");
        assert!(record.is_group());
        assert_eq!(record.provider_kind(), ChannelKind::Team);
        assert!(record.is_admin("u1"));
        assert!(!record.is_admin("u2"));

        let settings = record.settings.unwrap();
        assert!(settings.allow_member_invites);
        assert!(settings.is_private);
        assert_eq!(settings.extra.get("theme"), Some(&json!("green")));
    }

    #[test]
    fn record_round_trips_through_document_shape() {
        let record = ChannelRecord::from_document("group_1", group_doc()).unwrap();
        let doc = record.to_document();

        assert_eq!(doc.get("type"), Some(&json!("group")));
        assert_eq!(doc.get("createdBy"), Some(&json!("u1")));
        assert!(doc.get("deleted").is_none());
    }

    #[test]
    fn merge_members_deduplicates_in_order() {
        let existing = vec!["u1".to_string(), "u2".to_string()];
        let additions = vec!["u2".to_string(), "u3".to_string(), "u3".to_string()];

        assert_eq!(merge_members(&existing, &additions), vec!["u1", "u2", "u3"]);
    }
}

//! User profile entity stored in the `users` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::providers::Document;

pub const USERS_COLLECTION: &str = "users";

/// Application role carried on profiles and chat users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Moderator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Moderator => "moderator",
        }
    }
}

/// Profile document. Fields written by the mobile app that the backend does
/// not interpret are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_token_generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Decode a stored document. Malformed typed fields are dropped rather
    /// than failing the whole read.
    pub fn from_document(uid: &str, doc: Document) -> Self {
        let mut doc = doc;
        doc.insert("uid".into(), Value::String(uid.to_owned()));
        match serde_json::from_value::<UserProfile>(Value::Object(doc.clone())) {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(uid, error = %err, "user profile has malformed fields");
                UserProfile {
                    uid: uid.to_owned(),
                    name: doc.get("name").and_then(Value::as_str).map(str::to_owned),
                    email: doc.get("email").and_then(Value::as_str).map(str::to_owned),
                    image: doc.get("image").and_then(Value::as_str).map(str::to_owned),
                    role: doc.get("role").and_then(Value::as_str).map(str::to_owned),
                    online: doc.get("online").and_then(Value::as_bool).unwrap_or(false),
                    deleted: doc.get("deleted").and_then(Value::as_bool).unwrap_or(false),
                    ..Default::default()
                }
            }
        }
    }

    /// Case-insensitive substring match over name and email.
    pub fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        [self.name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .any(|hay| hay.to_lowercase().contains(&needle))
    }
}

/// Lower-cased name kept alongside the profile for prefix searches.
pub fn search_name(name: &str) -> String {
    name.trim().to_lowercase()
}

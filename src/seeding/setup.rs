//! First-run setup: schema marker documents, system stats and the default
//! administrator.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::SeedError;
use crate::config::AdminSettings;
use crate::domain::providers::{
    into_document, timestamp_value, ChatProvider, ChatUser, DocumentStore, IdentityProvider, NewIdentityUser,
};
use crate::domain::{
    search_name, UserRole, CHANNELS_COLLECTION, CONVERSATIONS_COLLECTION, STATS_COLLECTION, STRUCTURE_DOC_ID,
    USERS_COLLECTION,
};

pub const SYSTEM_STATS_DOC_ID: &str = "system";
const ADMIN_DISPLAY_NAME: &str = "System Administrator";

fn structure_documents() -> [(&'static str, Value); 3] {
    [
        (
            USERS_COLLECTION,
            json!({
                "_description": "Users collection structure",
                "fields": {
                    "uid": "string - Identity provider UID, also the chat user id",
                    "name": "string - Display name",
                    "email": "string - Email address",
                    "image": "string - Profile image URL",
                    "online": "boolean - Online status",
                    "lastSeenAt": "timestamp - Last activity",
                    "searchName": "string - Lowercase name for search",
                    "role": "string - User role (user/admin/moderator)",
                    "createdAt": "timestamp - Account creation",
                    "updatedAt": "timestamp - Last update"
                }
            }),
        ),
        (
            CONVERSATIONS_COLLECTION,
            json!({
                "_description": "Conversations collection structure",
                "fields": {
                    "type": "string - direct/group",
                    "participants": "array - User IDs",
                    "streamChannelId": "string - Chat provider channel ID",
                    "name": "string - Group name (optional)",
                    "createdBy": "string - Creator user ID",
                    "lastMessageAt": "timestamp - Last message time",
                    "createdAt": "timestamp - Creation time",
                    "updatedAt": "timestamp - Last update"
                }
            }),
        ),
        (
            CHANNELS_COLLECTION,
            json!({
                "_description": "Channels collection structure",
                "fields": {
                    "type": "string - direct_message/group/team",
                    "name": "string - Channel name",
                    "description": "string - Channel description",
                    "streamChannelId": "string - Chat provider channel ID",
                    "members": "array - Member user IDs",
                    "admins": "array - Admin user IDs",
                    "createdBy": "string - Creator user ID",
                    "settings": "map - isPrivate, allowMemberInvites",
                    "lastMessageAt": "timestamp - Last activity",
                    "messageCount": "number - Total messages",
                    "deleted": "boolean - Soft-delete flag",
                    "createdAt": "timestamp - Creation time",
                    "updatedAt": "timestamp - Last update"
                }
            }),
        ),
    ]
}

/// Write the `_structure` marker into each collection and reset `stats/system`.
pub async fn setup_collections(store: &dyn DocumentStore, now: DateTime<Utc>) -> Result<(), SeedError> {
    for (collection, structure) in structure_documents() {
        store
            .set(collection, STRUCTURE_DOC_ID, into_document(structure), false)
            .await?;
        tracing::debug!(collection, "Structure document written");
    }

    let mut stats = into_document(json!({
        "totalUsers": 0,
        "totalConversations": 0,
        "totalChannels": 0,
        "totalMessages": 0,
        "onlineUsers": 0,
    }));
    stats.insert("lastUpdated".into(), timestamp_value(now));
    store.set(STATS_COLLECTION, SYSTEM_STATS_DOC_ID, stats, false).await?;

    tracing::info!("Document store collections set up");
    Ok(())
}

/// Remove the `_structure` markers written by [`setup_collections`].
pub async fn cleanup_structure(store: &dyn DocumentStore) -> Result<(), SeedError> {
    for (collection, _) in structure_documents() {
        store.delete(collection, STRUCTURE_DOC_ID).await?;
    }
    tracing::info!("Structure documents removed");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    /// No admin email/password configured
    Skipped,
    Existing(String),
    Created(String),
}

/// Create the configured administrator in all three providers unless an
/// account with that email already exists.
pub async fn create_default_admin(
    identity: &dyn IdentityProvider,
    store: &dyn DocumentStore,
    chat: &dyn ChatProvider,
    settings: &AdminSettings,
    now: DateTime<Utc>,
) -> Result<AdminOutcome, SeedError> {
    let (Some(email), Some(password)) = (
        settings.email.as_deref().filter(|e| !e.is_empty()),
        settings.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        tracing::warn!("Admin credentials not provided, skipping admin creation");
        return Ok(AdminOutcome::Skipped);
    };

    if let Some(existing) = identity.get_user_by_email(email).await? {
        tracing::info!(uid = %existing.uid, "Admin user already exists");
        return Ok(AdminOutcome::Existing(existing.uid));
    }

    let account = identity
        .create_user(NewIdentityUser {
            email: email.to_owned(),
            password: password.to_owned(),
            display_name: Some(ADMIN_DISPLAY_NAME.into()),
            email_verified: true,
        })
        .await?;

    let mut chat_user = ChatUser {
        id: account.uid.clone(),
        name: Some(ADMIN_DISPLAY_NAME.into()),
        role: Some(UserRole::Admin.as_str().into()),
        ..Default::default()
    };
    chat_user.extra.insert("email".into(), Value::String(email.to_owned()));
    chat.upsert_user(&chat_user).await?;

    let mut profile = into_document(json!({
        "uid": account.uid,
        "name": ADMIN_DISPLAY_NAME,
        "email": email,
        "image": null,
        "online": false,
        "deleted": false,
        "searchName": search_name(ADMIN_DISPLAY_NAME),
        "role": UserRole::Admin.as_str(),
    }));
    for field in ["lastSeenAt", "createdAt", "updatedAt"] {
        profile.insert(field.into(), timestamp_value(now));
    }
    store.set(USERS_COLLECTION, &account.uid, profile, false).await?;

    tracing::info!(uid = %account.uid, "Default admin user created");
    Ok(AdminOutcome::Created(account.uid))
}

#[derive(Debug)]
pub struct ConnectionReport {
    pub document_store: Result<(), String>,
    pub chat: Result<(), String>,
}

impl ConnectionReport {
    pub fn is_ok(&self) -> bool {
        self.document_store.is_ok() && self.chat.is_ok()
    }
}

/// Read `stats/system` and ping the chat provider.
pub async fn check_connections(store: &dyn DocumentStore, chat: &dyn ChatProvider) -> ConnectionReport {
    let (document_store, chat) = tokio::join!(store.get(STATS_COLLECTION, SYSTEM_STATS_DOC_ID), chat.ping());
    ConnectionReport {
        document_store: document_store.map(|_| ()).map_err(|e| e.to_string()),
        chat: chat.map_err(|e| e.to_string()),
    }
}

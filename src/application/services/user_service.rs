//! User Service
//!
//! Keeps a user consistent across the identity provider, the `users`
//! profile collection and the chat provider's user registry. Steps run in
//! sequence with no rollback; each failing step is logged with the uid.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::domain::providers::{
    timestamp_value, ChatProvider, ChatProviderError, ChatUser, Document, DocumentStore, DocumentStoreError,
    IdentityError, IdentityProvider, IdentityUser, Query, UserDeletion, WriteOp, MAX_BATCH_WRITES,
};
use crate::domain::{search_name, UserProfile, USERS_COLLECTION};

/// Fields mirrored from a profile update to the chat provider.
const CHAT_PROFILE_FIELDS: [&str; 3] = ["name", "image", "role"];

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// Register or refresh the user at the chat provider and in the profile
    /// collection, using the identity record for missing fields.
    async fn get_or_create_user(&self, uid: &str, data: Document) -> Result<SyncedUser, UserError>;

    /// Chat client token; `expires_at` is a unix timestamp in seconds.
    async fn generate_user_token(&self, uid: &str, expires_at: Option<i64>) -> Result<UserToken, UserError>;

    async fn get_user_profile(&self, uid: &str) -> Result<UserProfileView, UserError>;

    async fn update_user_profile(&self, uid: &str, updates: Document) -> Result<UserProfile, UserError>;

    async fn delete_user(&self, uid: &str, options: UserDeletion) -> Result<(), UserError>;

    async fn search_users(&self, query: &str, filters: UserFilters, limit: usize) -> Result<Vec<UserProfile>, UserError>;

    /// Apply profile updates in batches; returns the number of users updated.
    async fn batch_update_users(&self, updates: Vec<UserUpdate>) -> Result<usize, UserError>;

    async fn user_stats(&self) -> Result<UserStats, UserError>;

    async fn set_presence(
        &self,
        uid: &str,
        online: Option<bool>,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<UserProfile, UserError>;
}

/// Result of [`UserService::get_or_create_user`].
#[derive(Debug, Clone)]
pub struct SyncedUser {
    pub identity: IdentityUser,
    pub profile: UserProfile,
    pub chat: ChatUser,
    /// True when the profile document was created by this call
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct UserToken {
    pub token: String,
    pub user: ChatUser,
    pub expires: Option<DateTime<Utc>>,
}

/// Combined view of one user across all three providers.
#[derive(Debug, Clone)]
pub struct UserProfileView {
    pub uid: String,
    pub identity: IdentityUser,
    pub profile: Option<UserProfile>,
    pub chat: Option<ChatUser>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilters {
    pub role: Option<String>,
    pub online: Option<bool>,
}

/// One entry of a batch profile update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserUpdate {
    pub uid: String,
    #[serde(default)]
    pub data: Document,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: usize,
    pub online_users: usize,
    pub new_users_today: usize,
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] DocumentStoreError),

    #[error(transparent)]
    Chat(#[from] ChatProviderError),
}

/// UserService implementation
pub struct UserServiceImpl {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    chat: Arc<dyn ChatProvider>,
}

impl UserServiceImpl {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        chat: Arc<dyn ChatProvider>,
    ) -> Self {
        Self { identity, store, chat }
    }

    async fn read_profile(&self, uid: &str) -> Result<UserProfile, UserError> {
        let doc = self
            .store
            .get(USERS_COLLECTION, uid)
            .await?
            .ok_or_else(|| UserError::NotFound("User profile not found".into()))?;
        Ok(UserProfile::from_document(uid, doc))
    }

    /// Merge fields into an existing profile document.
    async fn write_profile(&self, uid: &str, data: Document) -> Result<(), UserError> {
        match self.store.update(USERS_COLLECTION, uid, data).await {
            Ok(()) => Ok(()),
            Err(DocumentStoreError::NotFound { .. }) => Err(UserError::NotFound("User profile not found".into())),
            Err(err) => {
                error!(uid, error = %err, "Failed to update user profile");
                Err(err.into())
            }
        }
    }
}

/// Chat-provider fields for a user: resolved name, image, email and role,
/// then any other caller-supplied fields.
fn chat_user_fields(identity: &IdentityUser, data: Document) -> Document {
    let text = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };

    let name = text("name")
        .or_else(|| identity.display_name.clone())
        .or_else(|| identity.email.clone())
        .unwrap_or_else(|| "Unknown User".into());
    let image = text("image")
        .or_else(|| identity.photo_url.clone())
        .unwrap_or_default();
    let role = text("role").unwrap_or_else(|| "user".into());

    let mut fields = Document::new();
    fields.insert("id".into(), Value::String(identity.uid.clone()));
    fields.insert("name".into(), Value::String(name));
    fields.insert("image".into(), Value::String(image));
    if let Some(email) = &identity.email {
        fields.insert("email".into(), Value::String(email.clone()));
    }
    fields.insert("role".into(), Value::String(role));
    fields.insert("online".into(), Value::Bool(true));

    for (key, value) in data {
        if !matches!(key.as_str(), "id" | "name" | "image" | "email" | "role") {
            fields.insert(key, value);
        }
    }
    fields
}

/// Stamp `updatedAt` and keep `searchName` in step with `name`.
fn with_write_metadata(mut data: Document, now: DateTime<Utc>) -> Document {
    if let Some(name) = data.get("name").and_then(Value::as_str) {
        let lowered = search_name(name);
        data.insert("searchName".into(), Value::String(lowered));
    }
    data.insert("updatedAt".into(), timestamp_value(now));
    data
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn get_or_create_user(&self, uid: &str, data: Document) -> Result<SyncedUser, UserError> {
        let identity = self
            .identity
            .get_user(uid)
            .await
            .inspect_err(|e| error!(uid, error = %e, "Identity lookup failed"))?
            .ok_or_else(|| UserError::NotFound("Firebase user not found".into()))?;

        let fields = chat_user_fields(&identity, data);
        let chat = self
            .chat
            .upsert_user(&ChatUser::from_fields(uid, fields.clone()))
            .await
            .inspect_err(|e| error!(uid, error = %e, "Chat user upsert failed"))?;

        let now = Utc::now();
        let mut doc = with_write_metadata(fields, now);
        doc.remove("id");

        let created = self.store.get(USERS_COLLECTION, uid).await?.is_none();
        if created {
            doc.insert("createdAt".into(), timestamp_value(now));
            doc.insert("deleted".into(), Value::Bool(false));
            self.store
                .set(USERS_COLLECTION, uid, doc, false)
                .await
                .inspect_err(|e| error!(uid, error = %e, "Failed to create user profile"))?;
            info!(uid, "User profile created");
        } else {
            self.write_profile(uid, doc).await?;
        }

        let profile = self.read_profile(uid).await?;
        Ok(SyncedUser {
            identity,
            profile,
            chat,
            created,
        })
    }

    async fn generate_user_token(&self, uid: &str, expires_at: Option<i64>) -> Result<UserToken, UserError> {
        let user = self.chat.get_user(uid).await?.ok_or_else(|| {
            UserError::NotFound("User not found in chat provider. Please create user first.".into())
        })?;

        let token = self.chat.create_token(uid, expires_at)?;

        let now = Utc::now();
        let mut stamp = Document::new();
        stamp.insert("lastLoginAt".into(), timestamp_value(now));
        stamp.insert("lastTokenGeneratedAt".into(), timestamp_value(now));
        self.write_profile(uid, with_write_metadata(stamp, now)).await?;

        Ok(UserToken {
            token,
            user,
            expires: expires_at.and_then(|exp| DateTime::from_timestamp(exp, 0)),
        })
    }

    async fn get_user_profile(&self, uid: &str) -> Result<UserProfileView, UserError> {
        let (identity, profile, chat) = tokio::join!(
            self.identity.get_user(uid),
            self.store.get(USERS_COLLECTION, uid),
            self.chat.get_user(uid),
        );

        let identity = identity?.ok_or_else(|| UserError::NotFound("User not found".into()))?;

        Ok(UserProfileView {
            uid: uid.to_owned(),
            identity,
            profile: profile?.map(|doc| UserProfile::from_document(uid, doc)),
            chat: chat?,
        })
    }

    async fn update_user_profile(&self, uid: &str, updates: Document) -> Result<UserProfile, UserError> {
        let chat_fields: Map<String, Value> = CHAT_PROFILE_FIELDS
            .iter()
            .filter_map(|field| updates.get(*field).map(|v| (field.to_string(), v.clone())))
            .collect();

        self.write_profile(uid, with_write_metadata(updates, Utc::now())).await?;

        if !chat_fields.is_empty() {
            self.chat
                .partial_update_user(uid, chat_fields)
                .await
                .inspect_err(|e| error!(uid, error = %e, "Chat user update failed"))?;
        }

        self.read_profile(uid).await
    }

    async fn delete_user(&self, uid: &str, options: UserDeletion) -> Result<(), UserError> {
        self.chat
            .delete_user(uid, options)
            .await
            .inspect_err(|e| error!(uid, error = %e, "Chat user deletion failed"))?;

        let now = Utc::now();
        let mut data = Document::new();
        data.insert("deleted".into(), Value::Bool(true));
        data.insert("deletedAt".into(), timestamp_value(now));
        self.write_profile(uid, with_write_metadata(data, now)).await?;

        info!(uid, hard_delete = options.hard_delete, "User deleted");
        Ok(())
    }

    async fn search_users(&self, query: &str, filters: UserFilters, limit: usize) -> Result<Vec<UserProfile>, UserError> {
        // Profiles are created with `deleted: false`, so the limit only counts live users.
        let mut firestore_query = Query::collection(USERS_COLLECTION).where_eq("deleted", false);
        if let Some(role) = filters.role {
            firestore_query = firestore_query.where_eq("role", role);
        }
        if let Some(online) = filters.online {
            firestore_query = firestore_query.where_eq("online", online);
        }
        let firestore_query = firestore_query.limit(limit);

        let docs = self.store.query(&firestore_query).await?;

        Ok(docs
            .into_iter()
            .filter(|doc| !doc.id.starts_with('_'))
            .map(|doc| UserProfile::from_document(&doc.id, doc.data))
            .filter(|profile| profile.matches_text(query))
            .collect())
    }

    async fn batch_update_users(&self, updates: Vec<UserUpdate>) -> Result<usize, UserError> {
        if updates.iter().any(|u| u.uid.trim().is_empty()) {
            return Err(UserError::Invalid("Every update requires a uid".into()));
        }

        let now = Utc::now();
        for chunk in updates.chunks(MAX_BATCH_WRITES) {
            let writes = chunk
                .iter()
                .map(|update| WriteOp::Update {
                    collection: USERS_COLLECTION.into(),
                    id: update.uid.clone(),
                    data: with_write_metadata(update.data.clone(), now),
                })
                .collect();
            self.store
                .commit(writes)
                .await
                .inspect_err(|e| error!(error = %e, "Batch user update failed"))?;
        }

        info!(count = updates.len(), "Batch updated users");
        Ok(updates.len())
    }

    async fn user_stats(&self) -> Result<UserStats, UserError> {
        let docs = self.store.query(&Query::collection(USERS_COLLECTION)).await?;
        let today = Utc::now().date_naive();

        let stats = docs
            .into_iter()
            .filter(|doc| !doc.id.starts_with('_'))
            .map(|doc| UserProfile::from_document(&doc.id, doc.data))
            .filter(|profile| !profile.deleted)
            .fold(UserStats::default(), |mut stats, profile| {
                stats.total_users += 1;
                if profile.online {
                    stats.online_users += 1;
                }
                if profile.created_at.is_some_and(|at| at.date_naive() == today) {
                    stats.new_users_today += 1;
                }
                stats
            });

        Ok(stats)
    }

    async fn set_presence(
        &self,
        uid: &str,
        online: Option<bool>,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<UserProfile, UserError> {
        let mut updates = Document::new();
        if let Some(online) = online {
            updates.insert("online".into(), Value::Bool(online));
        }
        if let Some(at) = last_seen_at {
            updates.insert("lastSeenAt".into(), timestamp_value(at));
        }
        if updates.is_empty() {
            return Err(UserError::Invalid("No valid status updates provided".into()));
        }

        self.update_user_profile(uid, updates).await
    }
}

//! In-process identity provider.
//!
//! Bearer tokens have the form `memory:{uid}`. Unknown uids are provisioned
//! on first verification so local clients can sign in without setup.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::providers::{IdentityError, IdentityProvider, IdentityUser, NewIdentityUser, VerifiedToken};

pub const MEMORY_TOKEN_PREFIX: &str = "memory:";

#[derive(Default)]
pub struct MemoryIdentityProvider {
    users: RwLock<HashMap<String, IdentityUser>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bearer token accepted for `uid`.
    pub fn token_for(uid: &str) -> String {
        format!("{MEMORY_TOKEN_PREFIX}{uid}")
    }

    pub fn insert_user(&self, user: IdentityUser) {
        self.users.write().insert(user.uid.clone(), user);
    }

    fn provision(uid: &str) -> IdentityUser {
        IdentityUser {
            uid: uid.to_owned(),
            email: Some(format!("{uid}@ovo.local")),
            display_name: None,
            photo_url: None,
            email_verified: false,
            disabled: false,
            created_at: Some(Utc::now()),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        let uid = token
            .strip_prefix(MEMORY_TOKEN_PREFIX)
            .filter(|uid| !uid.is_empty() && !uid.contains(char::is_whitespace))
            .ok_or_else(|| IdentityError::InvalidToken("not a memory token".into()))?;

        let user = self
            .users
            .write()
            .entry(uid.to_owned())
            .or_insert_with(|| Self::provision(uid))
            .clone();
        if user.disabled {
            return Err(IdentityError::provider("auth/user-disabled", "USER_DISABLED"));
        }

        Ok(VerifiedToken {
            uid: user.uid,
            email: user.email,
            name: user.display_name,
            picture: user.photo_url,
            email_verified: user.email_verified,
        })
    }

    async fn get_user(&self, uid: &str) -> Result<Option<IdentityUser>, IdentityError> {
        Ok(self.users.read().get(uid).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, IdentityError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_user(&self, user: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
        if user.password.len() < 6 {
            return Err(IdentityError::provider("auth/weak-password", "WEAK_PASSWORD"));
        }
        let mut users = self.users.write();
        if users.values().any(|u| u.email.as_deref() == Some(user.email.as_str())) {
            return Err(IdentityError::provider("auth/email-already-exists", "EMAIL_EXISTS"));
        }

        let created = IdentityUser {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email: Some(user.email),
            display_name: user.display_name,
            photo_url: None,
            email_verified: user.email_verified,
            disabled: false,
            created_at: Some(Utc::now()),
        };
        users.insert(created.uid.clone(), created.clone());
        Ok(created)
    }
}

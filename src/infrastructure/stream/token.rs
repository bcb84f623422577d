//! Stream Chat token signing.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

use crate::domain::providers::ChatProviderError;

#[derive(Debug, Serialize)]
struct ServerClaims {
    server: bool,
}

#[derive(Debug, Serialize)]
struct UserClaims<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Token authenticating server-side API calls.
pub fn server_token(secret: &str) -> Result<String, ChatProviderError> {
    encode(
        &Header::default(),
        &ServerClaims { server: true },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ChatProviderError::Token(e.to_string()))
}

/// Client token for `user_id`; `exp` is unix seconds.
pub fn user_token(secret: &str, user_id: &str, exp: Option<i64>) -> Result<String, ChatProviderError> {
    if user_id.is_empty() {
        return Err(ChatProviderError::Token("user id is required".into()));
    }
    encode(
        &Header::default(),
        &UserClaims { user_id, exp },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ChatProviderError::Token(e.to_string()))
}

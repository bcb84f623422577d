//! Firebase Authentication over REST.
//!
//! ID tokens are verified locally against Google's published signing keys.
//! Account lookups and creation go through the Identity Toolkit API with a
//! service-account access token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::credentials::AccessTokenSource;
use crate::config::FirebaseSettings;
use crate::domain::providers::{IdentityError, IdentityProvider, IdentityUser, NewIdentityUser, VerifiedToken};
use crate::infrastructure::upstream::{google_error, observe};

const PROVIDER: &str = "firebase_auth";
const DEFAULT_KEYS_MAX_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
    /// Milliseconds since the epoch, encoded as a string
    #[serde(default)]
    created_at: Option<String>,
}

impl From<AccountRecord> for IdentityUser {
    fn from(record: AccountRecord) -> Self {
        let created_at = record
            .created_at
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        IdentityUser {
            uid: record.local_id,
            email: record.email,
            display_name: record.display_name,
            photo_url: record.photo_url,
            email_verified: record.email_verified,
            disabled: record.disabled,
            created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    max_age: Duration,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.max_age
    }
}

/// Map an Identity Toolkit error message to the `auth/...` vocabulary.
pub fn auth_code_for(message: &str) -> &'static str {
    let reason = message.split([' ', ':']).next().unwrap_or_default();
    match reason {
        "EMAIL_EXISTS" => "auth/email-already-exists",
        "DUPLICATE_LOCAL_ID" => "auth/uid-already-exists",
        "USER_NOT_FOUND" | "EMAIL_NOT_FOUND" => "auth/user-not-found",
        "USER_DISABLED" => "auth/user-disabled",
        "INVALID_EMAIL" => "auth/invalid-email",
        "INVALID_PASSWORD" => "auth/invalid-password",
        "WEAK_PASSWORD" => "auth/weak-password",
        "INVALID_ID_TOKEN" => "auth/invalid-id-token",
        "TOKEN_EXPIRED" => "auth/id-token-expired",
        "INVALID_LOCAL_ID" => "auth/invalid-uid",
        _ => "auth/internal-error",
    }
}

pub struct FirebaseIdentityProvider {
    http: reqwest::Client,
    tokens: Arc<AccessTokenSource>,
    project_id: String,
    issuer: String,
    jwks_url: String,
    identity_base_url: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseIdentityProvider {
    pub fn new(http: reqwest::Client, tokens: Arc<AccessTokenSource>, settings: &FirebaseSettings) -> Self {
        let project_id = tokens.project_id().to_owned();
        Self {
            http,
            issuer: format!("https://securetoken.google.com/{project_id}"),
            project_id,
            tokens,
            jwks_url: settings.jwks_url.clone(),
            identity_base_url: settings.identity_base_url.trim_end_matches('/').to_owned(),
            keys: RwLock::new(None),
        }
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, IdentityError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(IdentityError::Transport(format!(
                "signing keys request failed with {}",
                response.status()
            )));
        }

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEYS_MAX_AGE);
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        tracing::debug!(keys = keys.keys.len(), max_age = max_age.as_secs(), "Fetched token signing keys");
        Ok(CachedKeys {
            keys,
            fetched_at: Instant::now(),
            max_age,
        })
    }

    /// Decoding key for `kid`, refreshing the key set when it is stale or
    /// does not contain the key.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        {
            let cached = self.keys.read().await;
            if let Some(found) = cached
                .as_ref()
                .filter(|c| c.is_fresh())
                .and_then(|c| c.keys.find(kid))
            {
                return DecodingKey::from_jwk(found).map_err(|e| IdentityError::InvalidToken(e.to_string()));
            }
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh
            .keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        *self.keys.write().await = Some(fresh);
        key.ok_or_else(|| IdentityError::InvalidToken(format!("unknown signing key {kid}")))
    }

    async fn bearer(&self) -> Result<String, IdentityError> {
        self.tokens
            .token()
            .await
            .map_err(|e| IdentityError::Credentials(e.to_string()))
    }

    async fn post(&self, path: &str, body: Value) -> Result<reqwest::Response, IdentityError> {
        let token = self.bearer().await?;
        let url = format!("{}/v1/projects/{}/{}", self.identity_base_url, self.project_id, path);
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }
        let (_, message) = google_error(response).await;
        Err(IdentityError::provider(auth_code_for(&message), message))
    }

    async fn lookup(&self, body: Value) -> Result<Option<IdentityUser>, IdentityError> {
        let response = self.post("accounts:lookup", body).await?;
        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok(lookup.users.into_iter().next().map(IdentityUser::from))
    }
}

/// `max-age` directive of a Cache-Control header.
fn parse_max_age(header: &str) -> Option<Duration> {
    header
        .split(',')
        .filter_map(|part| part.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        observe(PROVIDER, "verify_id_token", async {
            let header = decode_header(token).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
            if header.alg != Algorithm::RS256 {
                return Err(IdentityError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
            }
            let kid = header
                .kid
                .ok_or_else(|| IdentityError::InvalidToken("missing key id".into()))?;
            let key = self.decoding_key(&kid).await?;

            let mut validation = Validation::new(Algorithm::RS256);
            validation.set_audience(&[&self.project_id]);
            validation.set_issuer(&[&self.issuer]);
            validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

            let claims = decode::<IdTokenClaims>(token, &key, &validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                    _ => IdentityError::InvalidToken(e.to_string()),
                })?
                .claims;
            if claims.sub.is_empty() {
                return Err(IdentityError::InvalidToken("empty subject".into()));
            }

            Ok(VerifiedToken {
                uid: claims.sub,
                email: claims.email,
                name: claims.name,
                picture: claims.picture,
                email_verified: claims.email_verified,
            })
        })
        .await
    }

    async fn get_user(&self, uid: &str) -> Result<Option<IdentityUser>, IdentityError> {
        observe(PROVIDER, "get_user", self.lookup(json!({ "localId": [uid] }))).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, IdentityError> {
        observe(PROVIDER, "get_user_by_email", self.lookup(json!({ "email": [email] }))).await
    }

    async fn create_user(&self, user: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
        observe(PROVIDER, "create_user", async {
            let mut body = json!({
                "email": user.email,
                "password": user.password,
                "emailVerified": user.email_verified,
            });
            if let Some(name) = &user.display_name {
                body["displayName"] = json!(name);
            }

            let created: SignUpResponse = self
                .post("accounts", body)
                .await?
                .json()
                .await
                .map_err(|e| IdentityError::Transport(e.to_string()))?;
            tracing::info!(uid = %created.local_id, "Created identity account");

            let fallback = IdentityUser {
                uid: created.local_id.clone(),
                email: Some(user.email),
                display_name: user.display_name,
                photo_url: None,
                email_verified: user.email_verified,
                disabled: false,
                created_at: Some(Utc::now()),
            };
            Ok(self
                .lookup(json!({ "localId": [created.local_id] }))
                .await?
                .unwrap_or(fallback))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("EMAIL_EXISTS", "auth/email-already-exists")]
    #[test_case("WEAK_PASSWORD : Password should be at least 6 characters", "auth/weak-password")]
    #[test_case("USER_NOT_FOUND", "auth/user-not-found")]
    #[test_case("PERMISSION_DENIED: caller lacks permission", "auth/internal-error")]
    fn maps_toolkit_messages(message: &str, code: &str) {
        assert_eq!(auth_code_for(message), code);
    }

    #[test_case("public, max-age=19302, must-revalidate", Some(19302))]
    #[test_case("no-cache", None)]
    fn reads_cache_max_age(header: &str, expected: Option<u64>) {
        assert_eq!(parse_max_age(header).map(|d| d.as_secs()), expected);
    }

    #[test]
    fn account_record_converts_created_at() {
        let record: AccountRecord = serde_json::from_value(json!({
            "localId": "u1",
            "email": "ana@example.com",
            "photoUrl": "https://img.example/a.png",
            "createdAt": "1700000000000"
        }))
        .unwrap();

        let user = IdentityUser::from(record);
        assert_eq!(user.uid, "u1");
        assert_eq!(user.photo_url.as_deref(), Some("https://img.example/a.png"));
        assert_eq!(user.created_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }
}

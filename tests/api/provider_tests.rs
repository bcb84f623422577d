//! Provider Adapter Tests
//!
//! The Stream and Firebase REST adapters against a `wiremock` server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ovo_chat_backend::config::{FirebaseSettings, StreamSettings};
use ovo_chat_backend::domain::providers::{
    into_document, ChannelKind, ChatProvider, ChatProviderError, ChatUser, DocumentStore, DocumentStoreError,
    IdentityError, IdentityProvider, NewChannel,
};
use ovo_chat_backend::infrastructure::firebase::{
    AccessTokenSource, FirebaseIdentityProvider, FirestoreDocumentStore, ServiceAccount,
};
use ovo_chat_backend::infrastructure::stream::StreamChatClient;
use ovo_chat_backend::infrastructure::upstream::http_client;

const PROJECT: &str = "ovo-test";
const TEST_KEY_PEM: &str = include_str!("../fixtures/test_rsa_key.pem");
const TEST_JWKS: &str = include_str!("../fixtures/test_jwks.json");
const DOCS: &str = "/v1/projects/ovo-test/databases/(default)/documents";

fn client() -> reqwest::Client {
    http_client(Duration::from_secs(5)).unwrap()
}

fn stream(server: &MockServer) -> StreamChatClient {
    let settings = StreamSettings {
        api_key: "stream-test-key".into(),
        secret: "stream-test-secret".into(),
        base_url: server.uri(),
    };
    StreamChatClient::new(client(), &settings).unwrap()
}

fn firebase_settings(server: &MockServer) -> FirebaseSettings {
    FirebaseSettings {
        project_id: Some(PROJECT.into()),
        client_email: Some("backend@ovo-test.iam.gserviceaccount.com".into()),
        private_key: Some(TEST_KEY_PEM.into()),
        credentials_file: None,
        token_uri: format!("{}/token", server.uri()),
        jwks_url: format!("{}/jwks", server.uri()),
        identity_base_url: server.uri(),
        firestore_base_url: server.uri(),
    }
}

fn token_source(settings: &FirebaseSettings) -> Arc<AccessTokenSource> {
    let account = ServiceAccount::from_settings(settings).unwrap();
    Arc::new(AccessTokenSource::new(client(), account, &settings.token_uri).unwrap())
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-access-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

// --- Stream ---

#[tokio::test]
async fn test_stream_client_requires_credentials() {
    let settings = StreamSettings {
        api_key: String::new(),
        secret: "secret".into(),
        base_url: "http://localhost".into(),
    };

    assert!(StreamChatClient::new(client(), &settings).is_err());
}

#[tokio::test]
async fn test_stream_ping_sends_api_key_and_server_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app"))
        .and(query_param("api_key", "stream-test-key"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"app": {"name": "ovo"}})))
        .expect(1)
        .mount(&server)
        .await;

    stream(&server).ping().await.unwrap();
}

#[tokio::test]
async fn test_stream_upsert_user_posts_user_map() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_partial_json(json!({"users": {"u1": {"id": "u1", "name": "Ana"}}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "users": {"u1": {"id": "u1", "name": "Ana", "role": "user", "online": false}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = ChatUser {
        id: "u1".into(),
        name: Some("Ana".into()),
        ..Default::default()
    };
    let saved = stream(&server).upsert_user(&user).await.unwrap();

    assert_eq!(saved.id, "u1");
    assert_eq!(saved.role.as_deref(), Some("user"));
}

#[tokio::test]
async fn test_stream_not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/team/group_1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 16,
            "message": "Channel team:group_1 does not exist"
        })))
        .mount(&server)
        .await;

    let err = stream(&server)
        .add_members(ChannelKind::Team, "group_1", &["u2".to_owned()])
        .await
        .unwrap_err();

    assert!(matches!(err, ChatProviderError::NotFound(message) if message.contains("does not exist")));
}

#[tokio::test]
async fn test_stream_api_error_keeps_status_and_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 4,
            "message": "UpdateUsers failed with error: \"invalid id\""
        })))
        .mount(&server)
        .await;

    let user = ChatUser {
        id: "bad id".into(),
        ..Default::default()
    };
    let err = stream(&server).upsert_user(&user).await.unwrap_err();

    match err {
        ChatProviderError::Api { status, code, message } => {
            assert_eq!(status, 400);
            assert_eq!(code, 4);
            assert!(message.contains("invalid id"));
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_create_channel_reads_channel_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/messaging/dm_u1_u2/query"))
        .and(body_partial_json(json!({"data": {"created_by_id": "u1", "members": ["u1", "u2"]}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "channel": {
                "id": "dm_u1_u2",
                "type": "messaging",
                "cid": "messaging:dm_u1_u2",
                "name": "u1_u2"
            },
            "members": [
                {"user_id": "u1", "role": "owner"},
                {"user_id": "u2", "role": "member"}
            ],
            "messages": [],
            "read": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let channel = stream(&server)
        .create_channel(NewChannel {
            kind: ChannelKind::Messaging,
            id: "dm_u1_u2".into(),
            created_by: "u1".into(),
            members: vec!["u1".into(), "u2".into()],
            data: into_document(json!({"name": "u1_u2"})),
        })
        .await
        .unwrap();

    assert_eq!(channel.cid, "messaging:dm_u1_u2");
    assert_eq!(channel.name.as_deref(), Some("u1_u2"));
    assert!(channel.has_member("u2"));
}

#[tokio::test]
async fn test_stream_user_tokens_are_signed_locally() {
    let server = MockServer::start().await;

    let token = stream(&server).create_token("u1", None).unwrap();

    assert_eq!(token.split('.').count(), 3);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

// --- Firestore ---

#[tokio::test]
async fn test_firestore_get_decodes_typed_fields() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/u1")))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/ovo-test/databases/(default)/documents/users/u1",
            "fields": {
                "name": {"stringValue": "Ana Pop"},
                "online": {"booleanValue": true},
                "eventCount": {"integerValue": "3"}
            }
        })))
        .mount(&server)
        .await;

    let settings = firebase_settings(&server);
    let store = FirestoreDocumentStore::new(client(), token_source(&settings), &settings);
    let doc = store.get("users", "u1").await.unwrap().unwrap();

    assert_eq!(doc["name"], json!("Ana Pop"));
    assert_eq!(doc["online"], json!(true));
    assert_eq!(doc["eventCount"], json!(3));
}

#[tokio::test]
async fn test_firestore_missing_document_is_none() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/ghost")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Document not found", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    let settings = firebase_settings(&server);
    let store = FirestoreDocumentStore::new(client(), token_source(&settings), &settings);

    assert!(store.get("users", "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_firestore_errors_carry_provider_status() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/users/u1")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let settings = firebase_settings(&server);
    let store = FirestoreDocumentStore::new(client(), token_source(&settings), &settings);
    let err = store
        .set("users", "u1", into_document(json!({"name": "Ana"})), true)
        .await
        .unwrap_err();

    match err {
        DocumentStoreError::Provider { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("insufficient permissions"));
        }
        other => panic!("expected a provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_firestore_document_ids_are_percent_encoded() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/a%20b%3F")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/ovo-test/databases/(default)/documents/users/a b?",
            "fields": {"name": {"stringValue": "Ana"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = firebase_settings(&server);
    let store = FirestoreDocumentStore::new(client(), token_source(&settings), &settings);
    let doc = store.get("users", "a b?").await.unwrap().unwrap();

    assert_eq!(doc["name"], json!("Ana"));
}

#[tokio::test]
async fn test_firestore_rejects_ids_with_path_separators() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let settings = firebase_settings(&server);
    let store = FirestoreDocumentStore::new(client(), token_source(&settings), &settings);

    for id in ["../channels/c1", "a/b", ".."] {
        let err = store
            .set("users", id, into_document(json!({"role": "admin"})), true)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidId(_)), "{id}: {err:?}");
    }
}

#[tokio::test]
async fn test_access_token_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.cached",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = token_source(&firebase_settings(&server));

    assert_eq!(tokens.token().await.unwrap(), "ya29.cached");
    assert_eq!(tokens.token().await.unwrap(), "ya29.cached");
}

// --- Identity ---

fn id_token(kid: &str, sub: &str, audience: &str, expires_in: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": format!("https://securetoken.google.com/{audience}"),
        "aud": audience,
        "sub": sub,
        "iat": now,
        "exp": now + expires_in,
        "email": format!("{sub}@example.com"),
        "email_verified": true,
        "name": "Ana Pop"
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_owned());
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).unwrap();
    encode(&header, &claims, &key).unwrap()
}

async fn identity_with_keys(server: &MockServer) -> FirebaseIdentityProvider {
    let jwks: Value = serde_json::from_str(TEST_JWKS).unwrap();
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("cache-control", "public, max-age=600")
                .set_body_json(jwks),
        )
        .mount(server)
        .await;
    let settings = firebase_settings(server);
    FirebaseIdentityProvider::new(client(), token_source(&settings), &settings)
}

#[tokio::test]
async fn test_identity_verifies_signed_id_token() {
    let server = MockServer::start().await;
    let identity = identity_with_keys(&server).await;

    let verified = identity
        .verify_id_token(&id_token("test-key-1", "u1", PROJECT, 600))
        .await
        .unwrap();

    assert_eq!(verified.uid, "u1");
    assert_eq!(verified.email.as_deref(), Some("u1@example.com"));
    assert_eq!(verified.name.as_deref(), Some("Ana Pop"));
    assert!(verified.email_verified);
}

#[tokio::test]
async fn test_identity_rejects_foreign_audience() {
    let server = MockServer::start().await;
    let identity = identity_with_keys(&server).await;

    let err = identity
        .verify_id_token(&id_token("test-key-1", "u1", "other-project", 600))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::InvalidToken(_)));
}

#[tokio::test]
async fn test_identity_reports_expired_tokens() {
    let server = MockServer::start().await;
    let identity = identity_with_keys(&server).await;

    let err = identity
        .verify_id_token(&id_token("test-key-1", "u1", PROJECT, -3600))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::TokenExpired));
}

#[tokio::test]
async fn test_identity_rejects_unknown_key_id() {
    let server = MockServer::start().await;
    let identity = identity_with_keys(&server).await;

    let err = identity
        .verify_id_token(&id_token("rotated-away", "u1", PROJECT, 600))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::InvalidToken(_)));
}

#[tokio::test]
async fn test_identity_lookup_by_uid() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/ovo-test/accounts:lookup"))
        .and(body_partial_json(json!({"localId": ["u1"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{
                "localId": "u1",
                "email": "u1@example.com",
                "displayName": "Ana Pop",
                "emailVerified": true,
                "createdAt": "1700000000000"
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/ovo-test/accounts:lookup"))
        .and(body_partial_json(json!({"localId": ["ghost"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let settings = firebase_settings(&server);
    let identity = FirebaseIdentityProvider::new(client(), token_source(&settings), &settings);

    let user = identity.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.display_name.as_deref(), Some("Ana Pop"));
    assert_eq!(user.created_at.map(|at| at.timestamp()), Some(1_700_000_000));

    assert!(identity.get_user("ghost").await.unwrap().is_none());
}

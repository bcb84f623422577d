//! Common Test Utilities
//!
//! Builds the real router over in-memory providers and wraps it in an
//! `axum_test::TestServer`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};

use ovo_chat_backend::application::services::{AuthService, AuthServiceImpl};
use ovo_chat_backend::config::{
    AdminSettings, CorsSettings, FirebaseSettings, JwtSettings, PlatformSettings, ProviderMode, ProviderSettings,
    RateLimitSettings, SecuritySettings, ServerSettings, Settings, StreamSettings,
};
use ovo_chat_backend::infrastructure::memory::{MemoryChatProvider, MemoryDocumentStore, MemoryIdentityProvider};
use ovo_chat_backend::presentation::http::routes::create_router;
use ovo_chat_backend::startup::{AppState, Providers};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-32-plus-chars";
pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_MAPS_KEY: &str = "AIza-test-maps-key";

/// Settings for a development-mode app over memory providers.
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
            body_limit_bytes: 1024 * 1024,
        },
        providers: ProviderSettings {
            mode: ProviderMode::Memory,
            request_timeout_secs: 5,
        },
        firebase: FirebaseSettings {
            project_id: Some("ovo-test".into()),
            client_email: None,
            private_key: None,
            credentials_file: None,
            token_uri: String::new(),
            jwks_url: String::new(),
            identity_base_url: String::new(),
            firestore_base_url: String::new(),
        },
        stream: StreamSettings {
            api_key: "stream-test-key".into(),
            secret: "stream-test-secret".into(),
            base_url: String::new(),
        },
        jwt: JwtSettings {
            secret: TEST_JWT_SECRET.into(),
            expires_in: "1h".into(),
            issuer: "ovo-meet-chat-backend".into(),
        },
        rate_limit: RateLimitSettings {
            window_ms: 60_000,
            max_requests: 1_000,
        },
        cors: CorsSettings {
            allowed_origins: vec!["http://localhost:3000".into()],
        },
        security: SecuritySettings {
            api_keys: vec![TEST_API_KEY.into()],
        },
        platform: PlatformSettings {
            google_api_key: Some(TEST_MAPS_KEY.into()),
        },
        admin: AdminSettings::default(),
        environment: "development".into(),
    }
}

/// Test application with handles on the memory providers
pub struct TestApp {
    pub server: TestServer,
    pub identity: Arc<MemoryIdentityProvider>,
    pub store: Arc<MemoryDocumentStore>,
    pub chat: Arc<MemoryChatProvider>,
    pub auth: AuthServiceImpl,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let store = Arc::new(MemoryDocumentStore::new());
        let chat = Arc::new(MemoryChatProvider::new());
        let providers = Providers {
            identity: identity.clone(),
            store: store.clone(),
            chat: chat.clone(),
        };
        let auth = AuthServiceImpl::new(settings.jwt.clone());

        let router = create_router(AppState::new(settings, providers));
        let server = TestServer::new(router).unwrap();

        Self {
            server,
            identity,
            store,
            chat,
            auth,
        }
    }

    /// Internal service token carrying `permissions`.
    pub fn service_token(&self, permissions: &[&str]) -> String {
        self.auth
            .issue_token("test-service", permissions.iter().map(|p| p.to_string()).collect())
            .unwrap()
            .token
    }

    /// Log `uid` in so that profile and chat user exist.
    pub async fn login(&self, uid: &str) {
        self.server
            .post("/api/auth/login")
            .add_header(header("authorization"), bearer(&user_token(uid)))
            .json(&serde_json::json!({}))
            .await
            .assert_status_ok();
    }
}

pub fn header(name: &'static str) -> HeaderName {
    HeaderName::from_static(name)
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

/// ID token accepted by the memory identity provider.
pub fn user_token(uid: &str) -> String {
    MemoryIdentityProvider::token_for(uid)
}

/// Attach a user's ID token to a request.
pub fn as_user(request: TestRequest, uid: &str) -> TestRequest {
    request.add_header(header("authorization"), bearer(&user_token(uid)))
}

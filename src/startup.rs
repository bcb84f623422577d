//! Application Startup
//!
//! Provider wiring, shared state and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::{
    AuthService, AuthServiceImpl, ChatService, ChatServiceImpl, UserService, UserServiceImpl,
};
use crate::config::{ProviderMode, Settings};
use crate::domain::providers::{ChatProvider, DocumentStore, IdentityProvider};
use crate::infrastructure::firebase::{
    AccessTokenSource, FirebaseIdentityProvider, FirestoreDocumentStore, ServiceAccount,
};
use crate::infrastructure::memory::{MemoryChatProvider, MemoryDocumentStore, MemoryIdentityProvider};
use crate::infrastructure::stream::StreamChatClient;
use crate::infrastructure::upstream;
use crate::platform::{ConfigBridge, PlatformMetadata};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::RateLimiter;

/// How often idle rate-limit windows are dropped.
const RATE_LIMIT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// The three external providers behind the service ports
#[derive(Clone)]
pub struct Providers {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub chat: Arc<dyn ChatProvider>,
}

impl Providers {
    /// In-process fakes; nothing leaves the process.
    pub fn in_memory() -> Self {
        Self {
            identity: Arc::new(MemoryIdentityProvider::new()),
            store: Arc::new(MemoryDocumentStore::new()),
            chat: Arc::new(MemoryChatProvider::new()),
        }
    }

    /// Firebase Authentication, Cloud Firestore and Stream Chat over HTTPS.
    pub fn live(settings: &Settings) -> Result<Self> {
        let http = upstream::http_client(Duration::from_secs(settings.providers.request_timeout_secs))
            .context("Failed to build upstream HTTP client")?;

        let account = ServiceAccount::from_settings(&settings.firebase)?;
        let tokens = Arc::new(AccessTokenSource::new(
            http.clone(),
            account,
            &settings.firebase.token_uri,
        )?);
        tracing::info!(project_id = %tokens.project_id(), "Firebase service account loaded");

        let identity = FirebaseIdentityProvider::new(http.clone(), tokens.clone(), &settings.firebase);
        let store = FirestoreDocumentStore::new(http.clone(), tokens, &settings.firebase);
        let chat = StreamChatClient::new(http, &settings.stream)?;

        Ok(Self {
            identity: Arc::new(identity),
            store: Arc::new(store),
            chat: Arc::new(chat),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.providers.mode {
            ProviderMode::Live => Self::live(settings),
            ProviderMode::Memory => {
                tracing::warn!("Using in-memory providers; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub providers: Providers,
    pub user_service: Arc<dyn UserService>,
    pub chat_service: Arc<dyn ChatService>,
    pub auth_service: Arc<dyn AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub platform: Arc<ConfigBridge>,
}

impl AppState {
    pub fn new(settings: Settings, providers: Providers) -> Self {
        let user_service = UserServiceImpl::new(
            providers.identity.clone(),
            providers.store.clone(),
            providers.chat.clone(),
        );
        let chat_service = ChatServiceImpl::new(providers.store.clone(), providers.chat.clone());

        Self {
            user_service: Arc::new(user_service),
            chat_service: Arc::new(chat_service),
            auth_service: Arc::new(AuthServiceImpl::new(settings.jwt.clone())),
            rate_limiter: Arc::new(RateLimiter::from_settings(&settings.rate_limit)),
            platform: Arc::new(ConfigBridge::new(PlatformMetadata::from_settings(&settings.platform))),
            settings: Arc::new(settings),
            providers,
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let providers = Providers::from_settings(&settings)?;
        Self::build_with_providers(settings, providers).await
    }

    /// Build around already-constructed providers.
    pub async fn build_with_providers(settings: Settings, providers: Providers) -> Result<Self> {
        health::init_server_start();

        let addr = settings.server_addr();
        let state = AppState::new(settings, providers);
        spawn_rate_limit_purge(state.rate_limiter.clone());

        let router = routes::create_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

fn spawn_rate_limit_purge(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return std::future::pending().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

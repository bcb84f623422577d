//! # OVO Chat Backend
//!
//! HTTP backend for the OVO Meet mobile app. It initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Identity, document store and chat providers
//! - HTTP server

use anyhow::Result;
use tracing::info;

use ovo_chat_backend::config::Settings;
use ovo_chat_backend::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    ovo_chat_backend::telemetry::init_tracing();

    info!("Starting OVO Chat Backend...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        providers = ?settings.providers.mode,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    info!("Server stopped");
    Ok(())
}

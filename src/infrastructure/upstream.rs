//! Shared plumbing for provider REST clients.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::metrics;

/// Run one provider call, recording its latency and outcome.
pub async fn observe<T, E, F>(provider: &'static str, operation: &'static str, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let result = call.await;
    let elapsed = started.elapsed().as_secs_f64();
    metrics::record_upstream_call(provider, operation, result.is_ok(), elapsed);
    if let Err(err) = &result {
        tracing::debug!(provider, operation, error = %err, elapsed, "Provider call failed");
    }
    result
}

/// HTTP client shared by all provider adapters.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ovo-chat-backend/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Google API error body: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Default, Deserialize)]
pub struct GoogleErrorBody {
    #[serde(default)]
    pub error: GoogleError,
}

#[derive(Debug, Default, Deserialize)]
pub struct GoogleError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Read a failed response into its status and Google error message.
pub async fn google_error(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorBody>(&text)
        .ok()
        .map(|body| body.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or(text);
    (status, message)
}

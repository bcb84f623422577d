//! Health Check Handlers
//!
//! # Endpoints
//! - `GET /` - Service banner
//! - `GET /health` - Basic health check used by the mobile app and load balancer
//! - `GET /health/live` - Liveness probe (is the server running?)
//! - `GET /health/ready` - Readiness probe (are the providers reachable?)
//! - `GET /metrics` - Prometheus text format

use std::time::Instant;

use axum::{
    extract::{OriginalUri, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::domain::{STATS_COLLECTION, STRUCTURE_DOC_ID};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::startup::AppState;

static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Pin the start time used for uptime (call during startup).
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub documentation: &'static str,
    pub health: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub environment: String,
}

/// Readiness report
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub document_store: ServiceHealth,
    pub chat: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Slower than this counts as degraded.
const DEGRADED_AFTER_MS: u64 = 1000;

pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "OVO Meet Chat Backend API",
        version: env!("CARGO_PKG_VERSION"),
        documentation: "/api/docs",
        health: "/health",
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.settings.environment.clone(),
    })
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Probe both data providers; 503 when either is unreachable.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.providers.store.clone();
    let chat = state.providers.chat.clone();

    let (document_store, chat) = tokio::join!(
        probe(async move { store.get(STATS_COLLECTION, STRUCTURE_DOC_ID).await.map(|_| ()) }),
        probe(async move { chat.ping().await }),
    );
    let status = determine_overall_status(&[&document_store, &chat]);

    let response = ReadinessResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        checks: HealthChecks { document_store, chat },
    };
    let code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}

async fn probe<F, E>(call: F) -> ServiceHealth
where
    F: std::future::Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    match call.await {
        Ok(()) => {
            let latency = started.elapsed().as_millis() as u64;
            ServiceHealth {
                status: if latency < DEGRADED_AFTER_MS {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(latency),
                message: None,
            }
        }
        Err(err) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(err.to_string()),
        },
    }
}

/// Worst status across all checks.
fn determine_overall_status(checks: &[&ServiceHealth]) -> HealthStatus {
    if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::gather_metrics(),
    )
}

/// Fallback for unknown routes.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found("ROUTE_NOT_FOUND", format!("Route {} not found", uri.path()))
}

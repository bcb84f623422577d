//! Prometheus Metrics Module
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Upstream provider call counts and latency (identity, firestore, stream)
//! - Requests rejected by the rate limiter

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "ovo_chat";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Calls made to third-party providers, by outcome ("ok" or "error")
pub static UPSTREAM_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("upstream_requests_total", "Total number of provider API calls")
            .namespace(NAMESPACE),
        &["provider", "operation", "outcome"],
    )
    .expect("Failed to create UPSTREAM_REQUESTS_TOTAL metric")
});

pub static UPSTREAM_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];
    HistogramVec::new(
        HistogramOpts::new(
            "upstream_request_duration_seconds",
            "Provider API call latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["provider", "operation"],
    )
    .expect("Failed to create UPSTREAM_REQUEST_DURATION_SECONDS metric")
});

pub static RATE_LIMITED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("rate_limited_total", "Requests rejected by the rate limiter")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create RATE_LIMITED_TOTAL metric")
});

fn register_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(UPSTREAM_REQUESTS_TOTAL.clone()),
        Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()),
        Box::new(RATE_LIMITED_TOTAL.clone()),
    ];
    for collector in collectors {
        if let Err(err) = registry.register(collector) {
            tracing::error!(error = %err, "Failed to register metric");
        }
    }
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_upstream_call(provider: &str, operation: &str, ok: bool, duration_secs: f64) {
    let outcome = if ok { "ok" } else { "error" };
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[provider, operation, outcome])
        .inc();
    UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[provider, operation])
        .observe(duration_secs);
}

pub fn record_rate_limited() {
    RATE_LIMITED_TOTAL.inc();
}

//! Health Check API Tests

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_banner_points_at_health() {
    let app = TestApp::new();

    let response = app.server.get("/").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "OVO Meet Chat Backend API");
    assert_eq!(body["health"], "/health");
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "development");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_each_provider() {
    let app = TestApp::new();

    let response = app.server.get("/health/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["checks"]["document_store"]["status"], "healthy");
    assert_eq!(body["checks"]["chat"]["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_are_prometheus_text() {
    let app = TestApp::new();
    app.server.get("/health").await;

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = TestApp::new();

    let response = app.server.get("/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "ROUTE_NOT_FOUND");
    assert_eq!(body["error"], "Route /nope not found");
}

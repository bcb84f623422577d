//! Middleware Tests
//!
//! API key gate, rate limiting, CORS, security headers and body limits,
//! exercised through the full router.

use axum::http::{HeaderValue, Method, StatusCode};
use serde_json::{json, Value};
use test_case::test_case;

use ovo_chat_backend::config::Settings;

use crate::common::{
    as_user, bearer, header, test_settings, TestApp, TEST_API_KEY, TEST_MAPS_KEY,
};

fn production_settings() -> Settings {
    let mut settings = test_settings();
    settings.environment = "production".into();
    settings
}

#[tokio::test]
async fn test_development_accepts_missing_api_key() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/auth/validate-token"), "u1").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_production_requires_api_key() {
    let app = TestApp::with_settings(production_settings());

    let response = as_user(app.server.get("/api/auth/validate-token"), "u1").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "API_KEY_MISSING");
}

#[tokio::test]
async fn test_unknown_api_key_is_rejected() {
    let app = TestApp::with_settings(production_settings());

    let response = as_user(app.server.get("/api/auth/validate-token"), "u1")
        .add_header(header("x-api-key"), HeaderValue::from_static("wrong-key"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "API_KEY_INVALID");
}

#[tokio::test]
async fn test_configured_api_key_is_accepted() {
    let app = TestApp::with_settings(production_settings());

    let response = as_user(app.server.get("/api/auth/validate-token"), "u1")
        .add_header(header("x-api-key"), HeaderValue::from_static(TEST_API_KEY))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_api_key_checked_before_identity() {
    let app = TestApp::with_settings(production_settings());

    let response = app.server.get("/api/auth/validate-token").await;

    assert_eq!(response.json::<Value>()["code"], "API_KEY_MISSING");
}

#[tokio::test]
async fn test_health_is_outside_api_key_gate() {
    let app = TestApp::with_settings(production_settings());

    app.server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_rejects_after_max_requests() {
    let mut settings = test_settings();
    settings.rate_limit.max_requests = 2;
    let app = TestApp::with_settings(settings);

    for remaining in ["1", "0"] {
        let response = as_user(app.server.get("/api/auth/validate-token"), "u1").await;
        response.assert_status_ok();
        assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "2");
        assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), remaining);
    }

    let limited = as_user(app.server.get("/api/auth/validate-token"), "u1").await;

    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().get("retry-after").is_some());
    assert!(limited.headers().get("x-ratelimit-reset").is_some());
    let body: Value = limited.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RATE_LIMITED");
    assert_eq!(body["error"], "Too many requests from this IP, please try again later.");
}

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let mut settings = test_settings();
    settings.rate_limit.max_requests = 1;
    let app = TestApp::with_settings(settings);

    for ip in ["203.0.113.7", "198.51.100.4"] {
        as_user(app.server.get("/api/auth/validate-token"), "u1")
            .add_header(header("x-forwarded-for"), HeaderValue::from_static(ip))
            .await
            .assert_status_ok();
    }

    as_user(app.server.get("/api/auth/validate-token"), "u1")
        .add_header(header("x-forwarded-for"), HeaderValue::from_static("203.0.113.7"))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limit_skips_health() {
    let mut settings = test_settings();
    settings.rate_limit.max_requests = 1;
    let app = TestApp::with_settings(settings);

    for _ in 0..3 {
        app.server.get("/health").await.assert_status_ok();
    }
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_hsts_only_in_production() {
    let app = TestApp::with_settings(production_settings());

    let response = app.server.get("/health").await;

    let hsts = response.headers().get("strict-transport-security").unwrap();
    assert!(hsts.to_str().unwrap().starts_with("max-age="));
}

#[tokio::test]
async fn test_development_cors_mirrors_origin() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/health")
        .add_header(header("origin"), HeaderValue::from_static("http://192.168.1.20:8081"))
        .await;

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://192.168.1.20:8081"
    );
}

#[tokio::test]
async fn test_production_cors_uses_allow_list() {
    let app = TestApp::with_settings(production_settings());

    let allowed = app
        .server
        .get("/health")
        .add_header(header("origin"), HeaderValue::from_static("http://localhost:3000"))
        .await;
    assert_eq!(
        allowed.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );

    let denied = app
        .server
        .get("/health")
        .add_header(header("origin"), HeaderValue::from_static("https://evil.example"))
        .await;
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut settings = test_settings();
    settings.server.body_limit_bytes = 256;
    let app = TestApp::with_settings(settings);

    let response = as_user(app.server.post("/api/auth/login"), "u1")
        .json(&json!({"userData": {"bio": "x".repeat(1024)}}))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/chat/dm"), "u1")
        .text("{not json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_maps_key_served_to_signed_in_users() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/config/maps-key"), "u1").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["googleApiKey"], TEST_MAPS_KEY);
}

#[tokio::test]
async fn test_maps_key_unavailable_when_unset() {
    let mut settings = test_settings();
    settings.platform.google_api_key = None;
    let app = TestApp::with_settings(settings);

    let response = as_user(app.server.get("/api/config/maps-key"), "u1").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[test_case(Method::POST, "/api/auth/login" ; "login")]
#[test_case(Method::POST, "/api/auth/refresh-token" ; "refresh token")]
#[test_case(Method::GET, "/api/auth/profile" ; "get profile")]
#[test_case(Method::PUT, "/api/auth/profile" ; "update profile")]
#[test_case(Method::DELETE, "/api/auth/account" ; "delete account")]
#[test_case(Method::POST, "/api/auth/logout" ; "logout")]
#[test_case(Method::GET, "/api/auth/validate-token" ; "validate token")]
#[test_case(Method::GET, "/api/users/search?q=ana" ; "search users")]
#[test_case(Method::GET, "/api/users/online" ; "online users")]
#[test_case(Method::GET, "/api/users/u2" ; "get user")]
#[test_case(Method::GET, "/api/users/u2/conversations" ; "user conversations")]
#[test_case(Method::PUT, "/api/users/u2/status" ; "update status")]
#[test_case(Method::GET, "/api/chat/conversations" ; "conversations")]
#[test_case(Method::POST, "/api/chat/dm" ; "direct message")]
#[test_case(Method::POST, "/api/chat/group" ; "create group")]
#[test_case(Method::GET, "/api/chat/channel/group_1" ; "get channel")]
#[test_case(Method::PUT, "/api/chat/channel/group_1" ; "update channel")]
#[test_case(Method::DELETE, "/api/chat/channel/group_1" ; "delete channel")]
#[test_case(Method::POST, "/api/chat/channel/group_1/members" ; "add members")]
#[test_case(Method::DELETE, "/api/chat/channel/group_1/members" ; "remove members")]
#[test_case(Method::GET, "/api/chat/channel/group_1/analytics" ; "channel analytics")]
#[test_case(Method::GET, "/api/channels/public" ; "public channels")]
#[test_case(Method::GET, "/api/channels/search?q=rust" ; "search channels")]
#[test_case(Method::GET, "/api/channels/trending" ; "trending channels")]
#[test_case(Method::POST, "/api/channels/general/join" ; "join channel")]
#[test_case(Method::POST, "/api/channels/general/leave" ; "leave channel")]
#[test_case(Method::GET, "/api/channels/general/members" ; "channel members")]
#[test_case(Method::GET, "/api/channels/general/messages" ; "channel messages")]
#[test_case(Method::GET, "/api/config/maps-key" ; "maps key")]
#[tokio::test]
async fn test_user_routes_require_id_token(method: Method, path: &str) {
    let app = TestApp::new();

    let missing = app.server.method(method.clone(), path).await;
    missing.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json::<Value>()["code"], "TOKEN_MISSING");

    let invalid = app
        .server
        .method(method, path)
        .add_header(header("authorization"), bearer("not-a-real-token"))
        .await;
    invalid.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(invalid.json::<Value>()["code"], "TOKEN_INVALID");
    assert_eq!(app.store.write_count(), 0);
}

#[test_case(Method::POST, "/api/users/batch-update" ; "batch update")]
#[test_case(Method::GET, "/api/users/stats" ; "user stats")]
#[tokio::test]
async fn test_service_routes_require_internal_token(method: Method, path: &str) {
    let app = TestApp::new();

    let missing = app.server.method(method.clone(), path).await;
    missing.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json::<Value>()["code"], "JWT_MISSING");

    let invalid = app
        .server
        .method(method, path)
        .add_header(header("authorization"), bearer("not-a-real-token"))
        .await;
    invalid.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(invalid.json::<Value>()["code"], "JWT_INVALID");
}

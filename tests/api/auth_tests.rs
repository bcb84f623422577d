//! Authentication API Tests

use axum::http::{HeaderValue, StatusCode};
use serde_json::{json, Value};

use crate::common::{as_user, header, TestApp};

#[tokio::test]
async fn test_login_requires_token() {
    let app = TestApp::new();

    let response = app.server.post("/api/auth/login").json(&json!({})).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn test_login_rejects_invalid_token() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/auth/login")
        .add_header(header("authorization"), HeaderValue::from_static("Bearer not-a-real-token"))
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_login_syncs_user_and_returns_chat_credentials() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/auth/login"), "u1")
        .json(&json!({"userData": {"name": "Ana Pop", "bio": "Hiking"}}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["data"]["user"]["uid"], "u1");
    assert_eq!(body["data"]["user"]["email"], "u1@ovo.local");
    assert_eq!(body["data"]["user"]["name"], "Ana Pop");
    assert_eq!(body["data"]["streamChat"]["apiKey"], "stream-test-key");
    assert!(!body["data"]["streamChat"]["token"].as_str().unwrap().is_empty());

    assert_eq!(app.store.document_count("users"), 1);
}

#[tokio::test]
async fn test_login_cannot_grant_admin_role() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/auth/login"), "u1")
        .json(&json!({"userData": {"name": "Ana Pop", "role": "admin", "deleted": true}}))
        .await;

    response.assert_status_ok();
    let profile = &response.json::<Value>()["data"]["user"]["profile"];
    assert_eq!(profile["role"], "user");
    assert_eq!(profile["deleted"], false);
}

#[tokio::test]
async fn test_repeated_login_keeps_single_profile() {
    let app = TestApp::new();

    app.login("u1").await;
    app.login("u1").await;

    assert_eq!(app.store.document_count("users"), 1);
}

#[tokio::test]
async fn test_refresh_token_issues_new_chat_token() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.post("/api/auth/refresh-token"), "u1")
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Token refreshed successfully");
    assert_eq!(body["data"]["apiKey"], "stream-test-key");
}

#[tokio::test]
async fn test_get_profile_after_login() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.get("/api/auth/profile"), "u1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["uid"], "u1");
    assert_eq!(body["data"]["email"], "u1@ovo.local");
    assert!(body["data"]["profile"].is_object());
}

#[tokio::test]
async fn test_update_profile_applies_fields() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.put("/api/auth/profile"), "u1")
        .json(&json!({"name": "Ana Pop", "bio": "Trail runner"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "Ana Pop");
    assert_eq!(body["data"]["bio"], "Trail runner");
}

#[tokio::test]
async fn test_update_profile_without_fields_is_rejected() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.put("/api/auth/profile"), "u1")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_update_profile_validates_image_url() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.put("/api/auth/profile"), "u1")
        .json(&json!({"image": "not a url"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_delete_account_requires_confirmation() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.delete("/api/auth/account"), "u1")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_marks_user_offline() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.post("/api/auth/logout"), "u1").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["message"], "Logout successful");

    let profile = as_user(app.server.get("/api/users/u1"), "u1").await;
    assert_eq!(profile.json::<Value>()["data"]["online"], false);
}

#[tokio::test]
async fn test_validate_token_echoes_identity() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/auth/validate-token"), "u1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["user"]["uid"], "u1");
}

//! User API Tests

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{as_user, bearer, header, TestApp};

async fn login_named(app: &TestApp, uid: &str, name: &str) {
    as_user(app.server.post("/api/auth/login"), uid)
        .json(&json!({"userData": {"name": name}}))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_search_matches_name_and_excludes_caller() {
    let app = TestApp::new();
    login_named(&app, "u1", "Ana Pop").await;
    login_named(&app, "u2", "Bob Stone").await;
    login_named(&app, "u3", "Bobby Tables").await;

    let response = as_user(app.server.get("/api/users/search"), "u2")
        .add_query_param("q", "bob")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["uid"], "u3");
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["query"], "bob");
}

#[tokio::test]
async fn test_search_rejects_out_of_range_limit() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/users/search"), "u1")
        .add_query_param("limit", 500)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_online_users_lists_others() {
    let app = TestApp::new();
    app.login("u1").await;
    app.login("u2").await;

    let response = as_user(app.server.get("/api/users/online"), "u1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["uid"], "u2");
}

#[tokio::test]
async fn test_get_user_hides_private_fields_from_others() {
    let app = TestApp::new();
    login_named(&app, "u1", "Ana Pop").await;

    let own = as_user(app.server.get("/api/users/u1"), "u1").await;
    own.assert_status_ok();
    assert_eq!(own.json::<Value>()["data"]["email"], "u1@ovo.local");

    let other = as_user(app.server.get("/api/users/u1"), "u2").await;
    other.assert_status_ok();
    let body: Value = other.json();
    assert_eq!(body["data"]["name"], "Ana Pop");
    assert!(body["data"].get("email").is_none());
}

#[tokio::test]
async fn test_get_unknown_user_is_not_found() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/users/ghost"), "u1").await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_update_own_status() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.put("/api/users/u1/status"), "u1")
        .json(&json!({"online": false}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["uid"], "u1");
    assert_eq!(body["data"]["online"], false);
}

#[tokio::test]
async fn test_update_status_of_other_user_is_denied() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.put("/api/users/u1/status"), "u2")
        .json(&json!({"online": true}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "ACCESS_DENIED");
}

#[tokio::test]
async fn test_update_status_requires_a_field() {
    let app = TestApp::new();
    app.login("u1").await;

    let response = as_user(app.server.put("/api/users/u1/status"), "u1")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_conversations_with_self_are_rejected() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/users/u1/conversations"), "u1").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_USER");
}

#[tokio::test]
async fn test_conversations_return_existing_dm() {
    let app = TestApp::new();

    let empty = as_user(app.server.get("/api/users/u2/conversations"), "u1").await;
    empty.assert_status_ok();
    assert_eq!(empty.json::<Value>()["data"]["total"], 0);

    as_user(app.server.post("/api/chat/dm"), "u1")
        .json(&json!({"otherUserId": "u2"}))
        .await
        .assert_status_ok();

    let response = as_user(app.server.get("/api/users/u1/conversations"), "u2").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["otherUser"], "u1");
    assert_eq!(body["data"]["conversations"][0]["id"], "dm_u1_u2");
}

#[tokio::test]
async fn test_stats_require_internal_token() {
    let app = TestApp::new();

    let response = app.server.get("/api/users/stats").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "JWT_MISSING");
}

#[tokio::test]
async fn test_stats_reject_firebase_token() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/users/stats"), "u1").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "JWT_INVALID");
}

#[tokio::test]
async fn test_stats_count_users() {
    let app = TestApp::new();
    app.login("u1").await;
    app.login("u2").await;
    let token = app.service_token(&["users:read"]);

    let response = app
        .server
        .get("/api/users/stats")
        .add_header(header("authorization"), bearer(&token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["totalUsers"], 2);
    assert_eq!(body["data"]["onlineUsers"], 2);
}

#[tokio::test]
async fn test_batch_update_requires_write_permission() {
    let app = TestApp::new();
    let token = app.service_token(&["users:read"]);

    let response = app
        .server
        .post("/api/users/batch-update")
        .add_header(header("authorization"), bearer(&token))
        .json(&json!({"updates": []}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "PERMISSIONS_INSUFFICIENT");
}

#[tokio::test]
async fn test_batch_update_requires_array() {
    let app = TestApp::new();
    let token = app.service_token(&["users:write"]);

    let response = app
        .server
        .post("/api/users/batch-update")
        .add_header(header("authorization"), bearer(&token))
        .json(&json!({"updates": {"uid": "u1"}}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_batch_update_applies_profile_changes() {
    let app = TestApp::new();
    app.login("u1").await;
    app.login("u2").await;
    let token = app.service_token(&["users:write"]);

    let response = app
        .server
        .post("/api/users/batch-update")
        .add_header(header("authorization"), bearer(&token))
        .json(&json!({"updates": [
            {"uid": "u1", "data": {"bio": "one"}},
            {"uid": "u2", "data": {"bio": "two"}}
        ]}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["updatedCount"], 2);

    let profile = as_user(app.server.get("/api/users/u2"), "u2").await;
    assert_eq!(profile.json::<Value>()["data"]["bio"], "two");
}

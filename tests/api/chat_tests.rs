//! Chat API Tests

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{as_user, TestApp};

async fn create_group(app: &TestApp, creator: &str, members: &[&str], allow_invites: bool) -> String {
    let response = as_user(app.server.post("/api/chat/group"), creator)
        .json(&json!({
            "name": "Weekend Hikers",
            "description": "Trails around the city",
            "members": members,
            "allowMemberInvites": allow_invites
        }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_direct_message_uses_sorted_pair_id() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/chat/dm"), "u2")
        .json(&json!({"otherUserId": "u1", "message": "Hi!"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["id"], "dm_u1_u2");
    assert_eq!(body["data"]["type"], "direct_message");
    assert_eq!(body["data"]["members"], json!(["u2", "u1"]));
    assert!(body["data"]["streamChannel"].is_object());
}

#[tokio::test]
async fn test_direct_message_is_created_once() {
    let app = TestApp::new();

    as_user(app.server.post("/api/chat/dm"), "u1")
        .json(&json!({"otherUserId": "u2"}))
        .await
        .assert_status_ok();
    let again = as_user(app.server.post("/api/chat/dm"), "u2")
        .json(&json!({"otherUserId": "u1"}))
        .await;

    again.assert_status_ok();
    let body: Value = again.json();
    assert_eq!(body["data"]["id"], "dm_u1_u2");
    assert!(body["data"].get("streamChannel").is_none());
    assert_eq!(app.chat.channel_creations(), 1);
}

#[tokio::test]
async fn test_direct_message_with_self_is_rejected() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/chat/dm"), "u1")
        .json(&json!({"otherUserId": " u1 "}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_DM_USERS");
}

#[tokio::test]
async fn test_direct_message_rejects_path_like_user_id() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/chat/dm"), "u1")
        .json(&json!({"otherUserId": "x/../../users/u2"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
    assert_eq!(app.chat.channel_creations(), 0);
}

#[tokio::test]
async fn test_direct_message_requires_other_user() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/chat/dm"), "u1").json(&json!({})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_group_includes_creator_as_admin() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/chat/group"), "u1")
        .json(&json!({"name": "  Book Club ", "members": ["u2", "u3", "u2", "u1"], "isPrivate": true}))
        .await;

    response.assert_status_ok();
    let data = &response.json::<Value>()["data"];
    assert!(data["id"].as_str().unwrap().starts_with("group_"));
    assert_eq!(data["type"], "group");
    assert_eq!(data["name"], "Book Club");
    assert_eq!(data["members"], json!(["u1", "u2", "u3"]));
    assert_eq!(data["admins"], json!(["u1"]));
    assert_eq!(data["settings"]["isPrivate"], true);
}

#[tokio::test]
async fn test_group_requires_members() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/chat/group"), "u1")
        .json(&json!({"name": "Empty", "members": []}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_channel_is_limited_to_members() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2"], true).await;

    let member = as_user(app.server.get(&format!("/api/chat/channel/{channel_id}")), "u2").await;
    member.assert_status_ok();
    assert_eq!(member.json::<Value>()["data"]["id"], channel_id.as_str());

    let outsider = as_user(app.server.get(&format!("/api/chat/channel/{channel_id}")), "u3").await;
    outsider.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(outsider.json::<Value>()["code"], "ACCESS_DENIED");
}

#[tokio::test]
async fn test_get_unknown_channel_is_not_found() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/chat/channel/group_0_missing"), "u1").await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "CHANNEL_NOT_FOUND");
}

#[tokio::test]
async fn test_only_admins_update_group() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2"], true).await;
    let path = format!("/api/chat/channel/{channel_id}");

    let denied = as_user(app.server.put(&path), "u2")
        .json(&json!({"name": "Renamed"}))
        .await;
    denied.assert_status(StatusCode::FORBIDDEN);

    let updated = as_user(app.server.put(&path), "u1")
        .json(&json!({"name": "Renamed"}))
        .await;
    updated.assert_status_ok();
    let body: Value = updated.json();
    assert_eq!(body["data"]["updates"]["name"], "Renamed");
    assert_eq!(body["data"]["updates"]["updatedBy"], "u1");

    let channel = as_user(app.server.get(&path), "u2").await;
    assert_eq!(channel.json::<Value>()["data"]["name"], "Renamed");
}

#[tokio::test]
async fn test_update_without_fields_is_rejected() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2"], true).await;

    let response = as_user(app.server.put(&format!("/api/chat/channel/{channel_id}")), "u1")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_soft_delete_keeps_record_readable() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2"], true).await;
    let path = format!("/api/chat/channel/{channel_id}");

    let response = as_user(app.server.delete(&path), "u1").json(&json!({})).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Channel archived successfully");
    assert_eq!(body["data"]["hardDeleted"], false);

    let channel = as_user(app.server.get(&path), "u1").await;
    channel.assert_status_ok();
    assert_eq!(channel.json::<Value>()["data"]["deleted"], true);
}

#[tokio::test]
async fn test_hard_delete_removes_record() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2"], true).await;
    let path = format!("/api/chat/channel/{channel_id}");

    as_user(app.server.delete(&path), "u1")
        .json(&json!({"hardDelete": true}))
        .await
        .assert_status_ok();

    as_user(app.server.get(&path), "u1")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_members_cannot_delete_group() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2"], true).await;

    let response = as_user(app.server.delete(&format!("/api/chat/channel/{channel_id}")), "u2")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_add_and_remove_members() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2"], false).await;
    let path = format!("/api/chat/channel/{channel_id}/members");

    let denied = as_user(app.server.post(&path), "u2")
        .json(&json!({"memberIds": ["u4"]}))
        .await;
    denied.assert_status(StatusCode::FORBIDDEN);

    let added = as_user(app.server.post(&path), "u1")
        .json(&json!({"memberIds": ["u3", "u4", "u3"]}))
        .await;
    added.assert_status_ok();
    let body: Value = added.json();
    assert_eq!(body["data"]["addedMembers"], json!(["u3", "u4"]));
    assert_eq!(body["data"]["totalMembers"], 4);

    let left = as_user(app.server.delete(&path), "u4")
        .json(&json!({"memberIds": ["u4"]}))
        .await;
    left.assert_status_ok();
    assert_eq!(left.json::<Value>()["data"]["totalMembers"], 3);

    let removed = as_user(app.server.delete(&path), "u2")
        .json(&json!({"memberIds": ["u3"]}))
        .await;
    removed.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_conversations_list_member_channels() {
    let app = TestApp::new();
    as_user(app.server.post("/api/chat/dm"), "u1")
        .json(&json!({"otherUserId": "u2"}))
        .await
        .assert_status_ok();
    create_group(&app, "u3", &["u1"], true).await;

    let response = as_user(app.server.get("/api/chat/conversations"), "u1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["total"], 2);
    let conversations = body["data"]["conversations"].as_array().unwrap();
    assert!(conversations.iter().all(|c| c["streamChannel"].is_object()));
    assert!(conversations.iter().any(|c| c["id"] == "dm_u1_u2"));

    let outsider = as_user(app.server.get("/api/chat/conversations"), "u9").await;
    assert_eq!(outsider.json::<Value>()["data"]["total"], 0);
}

#[tokio::test]
async fn test_conversations_can_skip_provider_lookup() {
    let app = TestApp::new();
    as_user(app.server.post("/api/chat/dm"), "u1")
        .json(&json!({"otherUserId": "u2"}))
        .await
        .assert_status_ok();

    let response = as_user(app.server.get("/api/chat/conversations"), "u1")
        .add_query_param("includeStream", false)
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["total"], 0);
}

#[tokio::test]
async fn test_channel_analytics_for_members() {
    let app = TestApp::new();
    let channel_id = create_group(&app, "u1", &["u2", "u3"], true).await;

    let response = as_user(app.server.get(&format!("/api/chat/channel/{channel_id}/analytics")), "u2")
        .add_query_param("startDate", "2026-01-01T00:00:00Z")
        .await;

    response.assert_status_ok();
    let data = &response.json::<Value>()["data"];
    assert_eq!(data["memberCount"], 3);
    assert_eq!(data["messageCount"], 0);
    assert_eq!(data["type"], "group");
    assert!(data["startDate"].is_string());
    assert!(data.get("endDate").is_none());
}

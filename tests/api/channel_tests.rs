//! Channel Discovery API Tests

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use ovo_chat_backend::domain::providers::ChannelKind;

use crate::common::{as_user, TestApp};

async fn create_team(app: &TestApp, creator: &str, members: &[&str], is_private: bool) -> String {
    let response = as_user(app.server.post("/api/chat/group"), creator)
        .json(&json!({
            "name": "Weekend Hikers",
            "description": "Trails around the city",
            "members": members,
            "isPrivate": is_private
        }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_public_channels_hide_joined_and_private() {
    let app = TestApp::new();
    let open = create_team(&app, "u1", &["u2"], false).await;
    create_team(&app, "u1", &["u2"], true).await;

    let outsider = as_user(app.server.get("/api/channels/public"), "u3").await;
    outsider.assert_status_ok();
    let body: Value = outsider.json();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["channels"][0]["id"], open.as_str());
    assert_eq!(body["data"]["channels"][0]["memberCount"], 2);
    assert_eq!(body["data"]["channels"][0]["createdBy"], "u1");

    let member = as_user(app.server.get("/api/channels/public"), "u2").await;
    assert_eq!(member.json::<Value>()["data"]["total"], 0);
}

#[tokio::test]
async fn test_public_channels_filter_by_name() {
    let app = TestApp::new();
    create_team(&app, "u1", &["u2"], false).await;

    let hit = as_user(app.server.get("/api/channels/public"), "u3")
        .add_query_param("search", "hik")
        .await;
    assert_eq!(hit.json::<Value>()["data"]["total"], 1);
    assert_eq!(hit.json::<Value>()["data"]["search"], "hik");

    let miss = as_user(app.server.get("/api/channels/public"), "u3")
        .add_query_param("search", "chess")
        .await;
    assert_eq!(miss.json::<Value>()["data"]["total"], 0);
}

#[tokio::test]
async fn test_join_then_leave_channel() {
    let app = TestApp::new();
    let channel_id = create_team(&app, "u1", &["u2"], false).await;

    let joined = as_user(app.server.post(&format!("/api/channels/{channel_id}/join")), "u3").await;
    joined.assert_status_ok();
    let body: Value = joined.json();
    assert_eq!(body["data"]["joined"], true);
    assert_eq!(body["data"]["memberCount"], 3);

    let record = as_user(app.server.get(&format!("/api/chat/channel/{channel_id}")), "u3").await;
    record.assert_status_ok();
    assert_eq!(record.json::<Value>()["data"]["members"], json!(["u1", "u2", "u3"]));

    let left = as_user(app.server.post(&format!("/api/channels/{channel_id}/leave")), "u3").await;
    left.assert_status_ok();
    assert_eq!(left.json::<Value>()["data"]["left"], true);

    as_user(app.server.get(&format!("/api/channels/{channel_id}/members")), "u3")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_private_channel_cannot_be_joined() {
    let app = TestApp::new();
    let channel_id = create_team(&app, "u1", &["u2"], true).await;

    let response = as_user(app.server.post(&format!("/api/channels/{channel_id}/join")), "u3").await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "PRIVATE_CHANNEL");
}

#[tokio::test]
async fn test_join_unknown_channel_is_not_found() {
    let app = TestApp::new();

    let response = as_user(app.server.post("/api/channels/group_0_missing/join"), "u1").await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "CHANNEL_NOT_FOUND");
}

#[tokio::test]
async fn test_members_are_paginated() {
    let app = TestApp::new();
    let channel_id = create_team(&app, "u1", &["u2", "u3", "u4"], false).await;

    let response = as_user(app.server.get(&format!("/api/channels/{channel_id}/members")), "u2")
        .add_query_param("offset", 1)
        .add_query_param("limit", 2)
        .await;

    response.assert_status_ok();
    let data = &response.json::<Value>()["data"];
    assert_eq!(data["total"], 4);
    assert_eq!(data["offset"], 1);
    assert_eq!(data["limit"], 2);
    assert_eq!(data["members"].as_array().unwrap().len(), 2);
    assert_eq!(data["channelId"], channel_id.as_str());
}

#[tokio::test]
async fn test_messages_require_membership() {
    let app = TestApp::new();
    let channel_id = create_team(&app, "u1", &["u2"], false).await;
    let now = Utc::now();
    app.chat.post_message(ChannelKind::Team, &channel_id, "u1", "first", now - Duration::minutes(2));
    app.chat.post_message(ChannelKind::Team, &channel_id, "u2", "second", now - Duration::minutes(1));

    let outsider = as_user(app.server.get(&format!("/api/channels/{channel_id}/messages")), "u3").await;
    outsider.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(outsider.json::<Value>()["code"], "ACCESS_DENIED");

    let member = as_user(app.server.get(&format!("/api/channels/{channel_id}/messages")), "u2").await;
    member.assert_status_ok();
    let body: Value = member.json();
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["channelId"], channel_id.as_str());
    let texts: Vec<&str> = body["data"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert!(texts.contains(&"first"));
    assert!(texts.contains(&"second"));
}

#[tokio::test]
async fn test_search_covers_member_channels() {
    let app = TestApp::new();
    create_team(&app, "u1", &["u2"], true).await;

    let member = as_user(app.server.get("/api/channels/search"), "u2")
        .add_query_param("q", "trail")
        .await;
    member.assert_status_ok();
    let body: Value = member.json();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["query"], "trail");
    assert_eq!(body["data"]["channels"][0]["type"], "team");

    let outsider = as_user(app.server.get("/api/channels/search"), "u3")
        .add_query_param("q", "trail")
        .await;
    assert_eq!(outsider.json::<Value>()["data"]["total"], 0);
}

#[tokio::test]
async fn test_search_requires_query() {
    let app = TestApp::new();

    let response = as_user(app.server.get("/api/channels/search"), "u1").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_trending_requires_recent_activity() {
    let app = TestApp::new();
    let active = create_team(&app, "u1", &["u2"], false).await;
    create_team(&app, "u1", &["u2"], false).await;
    app.chat.post_message(ChannelKind::Team, &active, "u1", "hello", Utc::now());

    let response = as_user(app.server.get("/api/channels/trending"), "u3")
        .add_query_param("timeframe", "24h")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["timeframe"], "24h");
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["channels"][0]["id"], active.as_str());
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile update and profile view tests.

use axum::http::{Method, StatusCode};
use serde_json::json;
use video_accounts::config::HistoryOrder;
use video_accounts::db::Store;
use video_accounts::models::{Subscription, Video};

mod common;
use common::{
    body_json, create_test_app, create_test_app_with, empty_request, json_request,
    signed_in_user, MultipartBody, TestApp,
};

fn video(id: &str, owner: &str) -> Video {
    Video {
        id: id.to_string(),
        video_file: format!("https://media.example/{id}.mp4"),
        thumbnail: Some(format!("https://media.example/{id}.jpg")),
        owner: owner.to_string(),
        title: format!("Video {id}"),
        description: Some("A video".to_string()),
        duration: 61.0,
        views: 3,
        is_published: true,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

async fn subscribe(app: &TestApp, subscriber: &str, channel: &str) {
    app.db
        .insert_subscription(&Subscription {
            id: format!("{subscriber}->{channel}"),
            subscriber: subscriber.to_string(),
            channel: channel.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        })
        .await
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// PASSWORD AND ACCOUNT DETAILS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_change_password() {
    let app = create_test_app();
    let (_, access, _) = signed_in_user(&app, "ab").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/change-password",
            json!({ "oldPassword": "wrong", "newPassword": "next" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Incorrect old password");

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/change-password",
            json!({ "oldPassword": "pass-123" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/change-password",
            json!({ "oldPassword": "pass-123", "newPassword": "next" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let login = |password: &str| {
        json_request(
            Method::POST,
            "/api/v1/users/login",
            json!({ "userName": "ab", "password": password }),
            None,
        )
    };
    assert_eq!(
        app.send(login("pass-123")).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(app.send(login("next")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_account() {
    let app = create_test_app();
    let (user_id, access, _) = signed_in_user(&app, "ab").await;
    signed_in_user(&app, "cd").await;

    let response = app
        .send(json_request(
            Method::PATCH,
            "/api/v1/users/update-account",
            json!({ "fullName": "New Name", "email": "cd@example.com" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(json_request(
            Method::PATCH,
            "/api/v1/users/update-account",
            json!({ "fullName": "New Name" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            Method::PATCH,
            "/api/v1/users/update-account",
            json!({ "fullName": "New Name", "email": "new@example.com" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["fullName"], "New Name");
    assert_eq!(json["data"]["email"], "new@example.com");
    assert!(json["data"].get("password").is_none());

    let stored = app.db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(stored.email, "new@example.com");
    assert!(app
        .db
        .find_user_by_email("ab@example.com")
        .await
        .unwrap()
        .is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// AVATAR AND COVER IMAGE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_avatar_replacement_deletes_previous() {
    let app = create_test_app();
    let (user_id, access, _) = signed_in_user(&app, "ab").await;
    let old_avatar = app.db.get_user(&user_id).await.unwrap().unwrap().avatar;

    let response = app
        .send(
            MultipartBody::new()
                .file("avatar", "new.png", b"new avatar")
                .request(Method::PATCH, "/api/v1/users/avatar", Some(&access)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let new_avatar = json["data"]["avatar"].as_str().unwrap().to_string();
    assert_ne!(new_avatar, old_avatar);
    assert_eq!(app.media.deletions(), vec![old_avatar]);

    let stored = app.db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(stored.avatar, new_avatar);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_failed_upload_keeps_previous_avatar() {
    let app = create_test_app();
    let (user_id, access, _) = signed_in_user(&app, "ab").await;
    let old_avatar = app.db.get_user(&user_id).await.unwrap().unwrap().avatar;
    app.media.set_failing(true);

    let response = app
        .send(
            MultipartBody::new()
                .file("avatar", "new.png", b"new avatar")
                .request(Method::PATCH, "/api/v1/users/avatar", Some(&access)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Error while updating avatar file"
    );

    let stored = app.db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(stored.avatar, old_avatar);
    assert!(app.media.deletions().is_empty());
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_missing_avatar_file() {
    let app = create_test_app();
    let (_, access, _) = signed_in_user(&app, "ab").await;

    let response = app
        .send(
            MultipartBody::new()
                .text("note", "no file here")
                .request(Method::PATCH, "/api/v1/users/avatar", Some(&access)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Avatar file is missing");
}

#[tokio::test]
async fn test_first_cover_image() {
    let app = create_test_app();
    let (user_id, access, _) = signed_in_user(&app, "ab").await;

    let response = app
        .send(
            MultipartBody::new()
                .file("coverImage", "cover.png", b"cover")
                .request(Method::PATCH, "/api/v1/users/cover-image", Some(&access)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.db.get_user(&user_id).await.unwrap().unwrap();
    assert!(stored.cover_image.is_some());
    // Nothing to delete on the first cover image.
    assert!(app.media.deletions().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// CHANNEL PROFILE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_channel_profile_counts() {
    let app = create_test_app();
    let (alice, alice_token, _) = signed_in_user(&app, "alice").await;
    let (bob, bob_token, _) = signed_in_user(&app, "bob").await;
    let (carol, _, _) = signed_in_user(&app, "carol").await;

    subscribe(&app, &bob, &alice).await;
    subscribe(&app, &carol, &alice).await;
    subscribe(&app, &alice, &carol).await;

    let response = app
        .send(empty_request(Method::GET, "/api/v1/users/c/alice", Some(&bob_token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let profile = &json["data"];
    assert_eq!(profile["_id"], alice.as_str());
    assert_eq!(profile["userName"], "alice");
    assert_eq!(profile["subscribersCount"], 2);
    assert_eq!(profile["channelsSubscribedToCount"], 1);
    assert_eq!(profile["isSubscribed"], true);
    assert!(profile.get("email").is_none());

    let response = app
        .send(empty_request(
            Method::GET,
            "/api/v1/users/c/alice",
            Some(&alice_token),
        ))
        .await;
    assert_eq!(body_json(response).await["data"]["isSubscribed"], false);
}

#[tokio::test]
async fn test_unknown_channel() {
    let app = create_test_app();
    let (_, access, _) = signed_in_user(&app, "ab").await;

    let response = app
        .send(empty_request(Method::GET, "/api/v1/users/c/nobody", Some(&access)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Channel does not exist");
}

// ═══════════════════════════════════════════════════════════════════════════
// WATCH HISTORY
// ═══════════════════════════════════════════════════════════════════════════

async fn history_ids(app: &TestApp) -> Vec<serde_json::Value> {
    let (viewer, access, _) = signed_in_user(app, "viewer").await;
    let (owner, _, _) = signed_in_user(app, "owner").await;

    for id in ["v1", "v2", "v3"] {
        app.db.insert_video(&video(id, &owner)).await.unwrap();
    }
    for id in ["v2", "v1", "v3"] {
        app.db.push_watch_history(&viewer, id).await.unwrap();
    }

    let response = app
        .send(empty_request(Method::GET, "/api/v1/users/history", Some(&access)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let entries = json["data"].as_array().unwrap().clone();
    for entry in &entries {
        assert_eq!(entry["owner"], json!({ "userName": "owner", "avatar": entry["owner"]["avatar"] }));
        assert!(entry["owner"]["avatar"].is_string());
        assert!(entry["owner"].get("email").is_none());
    }
    entries.iter().map(|e| e["_id"].clone()).collect()
}

#[tokio::test]
async fn test_history_in_stored_order() {
    let app = create_test_app();
    assert_eq!(history_ids(&app).await, vec!["v2", "v1", "v3"]);
}

#[tokio::test]
async fn test_history_most_recent_first() {
    let app = create_test_app_with(|config| config.history_order = HistoryOrder::MostRecentFirst);
    assert_eq!(history_ids(&app).await, vec!["v3", "v1", "v2"]);
}

#[tokio::test]
async fn test_empty_history() {
    let app = create_test_app();
    let (_, access, _) = signed_in_user(&app, "ab").await;

    let response = app
        .send(empty_request(Method::GET, "/api/v1/users/history", Some(&access)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!([]));
}

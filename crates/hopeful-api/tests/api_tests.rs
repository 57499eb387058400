//! Router tests: requests go through the full middleware stack against an
//! in-memory store.
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use hopeful_api::router;
use hopeful_api::state::{AppState, AppStateInner};
use hopeful_db::Database;
use hopeful_types::api::Claims;

const SECRET: &str = "test-secret";

fn state() -> AppState {
    let db = Database::open_in_memory().expect("Failed to open in-memory DB");
    AppStateInner::new(db, SECRET)
}

fn token(user_id: Uuid, email: Option<&str>) -> String {
    let claims = Claims {
        sub: user_id,
        email: email.map(str::to_string),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes()))
        .expect("Failed to sign token")
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Extractor rejections answer in plain text.
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Onboard a user and return their token.
async fn onboard(app: &Router, n: u128, username: &str) -> (Uuid, String) {
    let id = Uuid::from_u128(n);
    let tok = token(id, None);
    let (status, _) = send(app, Method::POST, "/users/me", Some(&tok), Some(json!({ "username": username }))).await;
    assert_eq!(status, StatusCode::CREATED);
    (id, tok)
}

async fn create_group(app: &Router, tok: &str, name: &str) -> Value {
    let (status, group) = send(app, Method::POST, "/groups", Some(tok), Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    group
}

#[tokio::test]
async fn test_health_is_public() {
    let app = router(state());
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_session_required() {
    let app = router(state());

    let (status, body) = send(&app, Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app, Method::GET, "/leaderboard", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_onboarding_defaults_to_email() {
    let app = router(state());
    let id = Uuid::new_v4();
    let tok = token(id, Some("sam@example.com"));

    let (status, user) = send(&app, Method::POST, "/users/me", Some(&tok), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "sam@example.com");

    let (status, me) = send(&app, Method::GET, "/users/me", Some(&tok), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.to_string());

    let (status, _) = send(&app, Method::POST, "/users/me", Some(&tok), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/users/me/avatar",
        Some(&tok),
        Some(json!({ "avatar_url": "ftp://nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_onboarding_keeps_long_email() {
    let app = router(state());
    let email = "firstname.middlename.lastname@applications.example-university.edu";
    let tok = token(Uuid::new_v4(), Some(email));

    let (status, user) = send(&app, Method::POST, "/users/me", Some(&tok), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], email);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = router(state());
    let tok = token(Uuid::new_v4(), None);
    let (status, _) = send(&app, Method::GET, "/users/me", Some(&tok), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_invite_flow() {
    let app = router(state());
    let (_, owner) = onboard(&app, 1, "owner").await;
    let (friend_id, friend) = onboard(&app, 2, "friend").await;

    let group = create_group(&app, &owner, "Job Hunt 2026").await;
    let code = group["invite_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);

    let (status, resolved) = send(&app, Method::GET, &format!("/invites/{}", code.to_lowercase()), Some(&friend), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["id"], group["id"]);

    let (status, _) = send(&app, Method::GET, "/invites/ZZZZZZZZ", Some(&friend), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, member) = send(&app, Method::POST, &format!("/invites/{}/join", code), Some(&friend), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["user_id"], friend_id.to_string());
    assert_eq!(member["is_active"], true);

    let members_uri = format!("/groups/{}/members", group["id"].as_str().unwrap());
    let (_, members) = send(&app, Method::GET, &members_uri, Some(&owner), None).await;
    assert_eq!(members.as_array().unwrap().len(), 2);

    let leave_uri = format!("/groups/{}/leave", group["id"].as_str().unwrap());
    let (status, left) = send(&app, Method::POST, &leave_uri, Some(&friend), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left["is_active"], false);

    let (_, members) = send(&app, Method::GET, &members_uri, Some(&owner), None).await;
    assert_eq!(members.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/groups/active", Some(&friend), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = send(&app, Method::GET, "/groups", Some(&friend), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_join_unknown_group_is_not_found() {
    let app = router(state());
    let (_, tok) = onboard(&app, 1, "solo").await;
    let uri = format!("/groups/{}/join", Uuid::new_v4());
    let (status, _) = send(&app, Method::POST, &uri, Some(&tok), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejection_requires_membership() {
    let app = router(state());
    let (_, owner) = onboard(&app, 1, "owner").await;
    let (_, outsider) = onboard(&app, 2, "outsider").await;
    let group = create_group(&app, &owner, "Editors").await;

    let body = json!({ "group_id": group["id"], "description": "Form letter" });
    let (status, body) = send(&app, Method::POST, "/rejections", Some(&outsider), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // No group_id and no active group.
    let (status, _) = send(&app, Method::POST, "/rejections", Some(&outsider), Some(json!({ "description": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/rejections", Some(&owner), Some(json!({ "description": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rejection_feed_and_delete() {
    let app = router(state());
    let (owner_id, owner) = onboard(&app, 1, "owner").await;
    let (_, other) = onboard(&app, 2, "other").await;
    let group = create_group(&app, &owner, "Agents").await;

    // Falls back to the active group.
    let (status, rejection) = send(
        &app,
        Method::POST,
        "/rejections",
        Some(&owner),
        Some(json!({ "description": "  Not a fit right now " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rejection["group_id"], group["id"]);
    assert_eq!(rejection["points"], 1);
    assert_eq!(rejection["description"], "Not a fit right now");

    let feed_uri = format!("/groups/{}/rejections?limit=500", group["id"].as_str().unwrap());
    let (status, feed) = send(&app, Method::GET, &feed_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["user_id"], owner_id.to_string());
    assert_eq!(feed[0]["username"], "owner");

    let delete_uri = format!("/rejections/{}", rejection["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::DELETE, &delete_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, &delete_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::DELETE, &delete_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leaderboard_endpoints() {
    let app = router(state());
    let (a_id, a) = onboard(&app, 2, "alex").await;
    let (b_id, b) = onboard(&app, 1, "blair").await;
    let group = create_group(&app, &a, "Founders").await;
    let code = group["invite_code"].as_str().unwrap();
    send(&app, Method::POST, &format!("/invites/{}/join", code), Some(&b), None).await;

    for _ in 0..2 {
        send(&app, Method::POST, "/rejections", Some(&a), Some(json!({ "description": "Pass" }))).await;
    }
    send(&app, Method::POST, "/rejections", Some(&b), Some(json!({ "group_id": group["id"], "description": "Pass" }))).await;

    let uri = format!("/leaderboard?group_id={}&timeframe=daily", group["id"].as_str().unwrap());
    let (status, board) = send(&app, Method::GET, &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["timeframe"], "daily");
    assert_eq!(board["degraded"], false);
    let entries = board["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["user_id"], a_id.to_string());
    assert_eq!(entries[0]["total_points"], 2);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[1]["user_id"], b_id.to_string());
    assert_eq!(entries[1]["rank"], 2);

    let (_, active) = send(&app, Method::GET, "/leaderboard/active", Some(&b), None).await;
    assert_eq!(active["group_id"], group["id"]);
    assert_eq!(active["timeframe"], "all");
    assert_eq!(active["entries"], board["entries"]);

    let uri = format!("/leaderboard?group_id={}", Uuid::new_v4());
    let (status, empty) = send(&app, Method::GET, &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(empty["entries"].as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, "/leaderboard?timeframe=yearly", Some(&b), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leaderboard_degrades_when_store_fails() {
    let state = state();
    let app = router(state.clone());
    let tok = token(Uuid::new_v4(), None);

    state
        .db
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE rejections;")?;
            Ok(())
        })
        .unwrap();

    let (status, board) = send(&app, Method::GET, "/leaderboard?timeframe=weekly", Some(&tok), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["degraded"], true);
    assert_eq!(board["message"], "could not load leaderboard");
    assert_eq!(board["timeframe"], "weekly");
    assert!(board["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_active_leaderboard_degrades_when_membership_lookup_fails() {
    let state = state();
    let app = router(state.clone());
    let tok = token(Uuid::new_v4(), None);

    state
        .db
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE group_members;")?;
            Ok(())
        })
        .unwrap();

    let (status, board) = send(&app, Method::GET, "/leaderboard/active", Some(&tok), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["degraded"], true);
    assert_eq!(board["group_id"], Value::Null);
    assert!(board["entries"].as_array().unwrap().is_empty());
}

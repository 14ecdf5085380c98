// ============================================================================
// REST API Users Endpoints Tests
// ============================================================================
//
// Tests for user endpoints:
// - POST /users/register - Register a new user
// - GET /users - Paginated user listing
// - GET /users/check-block - Block status between two users
// - POST /users/block - Block or unblock a target user
//
// ============================================================================

use serde_json::{json, Value};

use test_utils::{register_user, spawn_app};

#[tokio::test]
async fn register_returns_the_created_user() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/users/register", app.address))
        .json(&json!({ "username": "alice" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(!body["userId"].as_str().unwrap().is_empty());
    assert_eq!(body["username"], "alice");
    assert_eq!(body["blockedUsers"], json!([]));
}

#[tokio::test]
async fn register_without_a_username_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/users/register", app.address))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("http://{}/users/register", app.address))
        .json(&json!({ "username": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registered_user_appears_in_the_listing_exactly_once() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let alice = register_user(&client, &app.address, "alice").await;
    register_user(&client, &app.address, "bob").await;

    let response = client
        .get(format!("http://{}/users", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let occurrences = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|item| item["userId"] == json!(alice.user_id))
        .count();
    assert_eq!(occurrences, 1);
    assert!(body["nextCursor"].is_null());
}

#[tokio::test]
async fn user_listing_pages_with_a_cursor() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for i in 0..5 {
        register_user(&client, &app.address, &format!("user-{i}")).await;
    }

    let first: Value = client
        .get(format!("http://{}/users?limit=3", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["items"].as_array().unwrap().len(), 3);
    let cursor = first["nextCursor"].as_str().unwrap().to_string();

    let second: Value = client
        .get(format!(
            "http://{}/users?limit=3&cursor={}",
            app.address, cursor
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["items"].as_array().unwrap().len(), 2);
    assert!(second["nextCursor"].is_null());
}

#[tokio::test]
async fn check_block_for_an_unknown_user_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "http://{}/users/check-block?userId=ghost&targetId=anyone",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn block_and_unblock_round_trip() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let alice = register_user(&client, &app.address, "alice").await;
    let bob = register_user(&client, &app.address, "bob").await;

    let blocked: Value = client
        .post(format!("http://{}/users/block", app.address))
        .json(&json!({
            "userId": alice.user_id,
            "targetId": bob.user_id,
            "action": "block",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(blocked["blockedUsers"], json!([bob.user_id]));

    // Blocking twice leaves the block list unchanged.
    let blocked_again: Value = client
        .post(format!("http://{}/users/block", app.address))
        .json(&json!({
            "userId": alice.user_id,
            "targetId": bob.user_id,
            "action": "block",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(blocked_again["blockedUsers"], json!([bob.user_id]));

    let status = client
        .get(format!(
            "http://{}/users/check-block?userId={}&targetId={}",
            app.address, alice.user_id, bob.user_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(status.text().await.unwrap(), "User is blocked.");

    client
        .post(format!("http://{}/users/block", app.address))
        .json(&json!({
            "userId": alice.user_id,
            "targetId": bob.user_id,
            "action": "unblock",
        }))
        .send()
        .await
        .unwrap();

    let status = client
        .get(format!(
            "http://{}/users/check-block?userId={}&targetId={}",
            app.address, alice.user_id, bob.user_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(status.text().await.unwrap(), "User is not blocked.");
}

#[tokio::test]
async fn unknown_block_action_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let alice = register_user(&client, &app.address, "alice").await;

    let response = client
        .post(format!("http://{}/users/block", app.address))
        .json(&json!({
            "userId": alice.user_id,
            "targetId": "someone",
            "action": "mute",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

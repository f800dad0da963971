mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use social_service::models::user_type;
use uuid::Uuid;

#[tokio::test]
async fn test_toggle_follows_then_unfollows() {
    let app = TestApp::spawn().await;
    let (alice, token) = app.user_with_token("alice", user_type::USER).await;
    let bob = app.seed_user("bob", user_type::USER).await;

    let (status, body) = app
        .post("/v1/follower", Some(&token), json!({ "following_id": bob.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "created");
    assert_eq!(body["followed"], true);
    assert_eq!(body["follower_id"], alice.id.to_string());
    assert!(app.store.is_following(alice.id, bob.id).unwrap());
    assert!(app.store.has_user_tag(alice.id, &bob.id.to_string()).unwrap());

    let (status, body) = app
        .post("/v1/follower", Some(&token), json!({ "following_id": bob.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unfollowed");
    assert_eq!(body["followed"], false);
    assert!(!app.store.is_following(alice.id, bob.id).unwrap());
    assert!(!app.store.has_user_tag(alice.id, &bob.id.to_string()).unwrap());
}

#[tokio::test]
async fn test_toggle_count_parity_decides_final_state() {
    let app = TestApp::spawn().await;
    let (alice, token) = app.user_with_token("alice", user_type::USER).await;
    let bob = app.seed_user("bob", user_type::USER).await;

    for round in 1..=5 {
        let (status, _) = app
            .post("/v1/follower", Some(&token), json!({ "following_id": bob.id }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.store.is_following(alice.id, bob.id).unwrap(), round % 2 == 1);
    }
}

#[tokio::test]
async fn test_simultaneous_toggles_cancel_out() {
    let app = TestApp::spawn().await;
    let (alice, token) = app.user_with_token("alice", user_type::USER).await;
    let bob = app.seed_user("bob", user_type::USER).await;
    let body = json!({ "following_id": bob.id });

    let (first, second) = tokio::join!(
        app.post("/v1/follower", Some(&token), body.clone()),
        app.post("/v1/follower", Some(&token), body.clone()),
    );

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    let mut outcomes = [
        first.1["outcome"].as_str().unwrap().to_string(),
        second.1["outcome"].as_str().unwrap().to_string(),
    ];
    outcomes.sort();
    assert_eq!(outcomes, ["created", "unfollowed"]);
    assert!(!app.store.is_following(alice.id, bob.id).unwrap());
}

#[tokio::test]
async fn test_cannot_follow_self_or_unknown_account() {
    let app = TestApp::spawn().await;
    let (alice, token) = app.user_with_token("alice", user_type::USER).await;

    let (status, body) = app
        .post("/v1/follower", Some(&token), json!({ "following_id": alice.id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot follow yourself");

    let (status, _) = app
        .post(
            "/v1/follower",
            Some(&token),
            json!({ "following_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_regular_account_cannot_follow_on_behalf_of_others() {
    let app = TestApp::spawn().await;
    let (alice, token) = app.user_with_token("alice", user_type::USER).await;
    let bob = app.seed_user("bob", user_type::USER).await;
    let carol = app.seed_user("carol", user_type::USER).await;

    let (status, body) = app
        .post(
            "/v1/follower",
            Some(&token),
            json!({ "following_id": carol.id, "follower_id": bob.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["follower_id"], alice.id.to_string());
    assert!(app.store.is_following(alice.id, carol.id).unwrap());
    assert!(!app.store.is_following(bob.id, carol.id).unwrap());
}

#[tokio::test]
async fn test_admin_toggles_and_lists_for_any_account() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.user_with_token("root", user_type::ADMIN).await;
    let bob = app.seed_user("bob", user_type::USER).await;
    let carol = app.seed_user("carol", user_type::USER).await;

    let (status, body) = app
        .post(
            "/v1/follower",
            Some(&admin_token),
            json!({ "following_id": carol.id, "follower_id": bob.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["follower_id"], bob.id.to_string());
    assert!(app.store.is_following(bob.id, carol.id).unwrap());

    let (status, body) = app
        .get(
            &format!("/v1/follower/list?following_id={}", carol.id),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["username"], "bob");
    assert!(body["items"][0].get("password").is_none());

    let (status, body) = app.get("/v1/follower/list", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "following_id is required");

    let (status, _) = app
        .get("/v1/follower/list?following_id=not-a-uuid", Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_regular_account_lists_own_followers_newest_first() {
    let app = TestApp::spawn().await;
    let (alice, alice_token) = app.user_with_token("alice", user_type::USER).await;
    let (_, bob_token) = app.user_with_token("bob", user_type::USER).await;
    let (_, carol_token) = app.user_with_token("carol", user_type::USER).await;
    let (dave, dave_token) = app.user_with_token("dave", user_type::USER).await;

    for token in [&bob_token, &carol_token] {
        let (status, _) = app
            .post("/v1/follower", Some(token), json!({ "following_id": alice.id }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    app.post("/v1/follower", Some(&bob_token), json!({ "following_id": dave.id }))
        .await;

    // A foreign following_id is overridden by the caller's own id.
    let (status, body) = app
        .get(
            &format!("/v1/follower/list?following_id={}", dave.id),
            Some(&alice_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["items"][0]["username"], "carol");
    assert_eq!(body["items"][1]["username"], "bob");

    let (_, body) = app
        .get("/v1/follower/list?search=CAR", Some(&alice_token))
        .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["username"], "carol");

    let (_, body) = app.get("/v1/follower/list", Some(&dave_token)).await;
    assert_eq!(body["count"], 1);
}

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::TestApp;
use serde_json::json;
use social_service::{
    models::user_type,
    services::{Claims, JwtService, SessionStore, SessionUpdate},
};
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_public_routes_admit_anonymous_callers() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/follower"].is_object());
}

#[tokio::test]
async fn test_protected_route_without_credential_is_forbidden() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/v1/tag/list", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("/v1/tag/list"));
}

#[tokio::test]
async fn test_spoofed_claim_headers_are_ignored() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user("root", user_type::ADMIN).await;

    let request = Request::builder()
        .uri("/v1/user/list")
        .header("sub", admin.id.to_string())
        .header("user_role", "admin")
        .header("user_type", "admin")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_foreign_signature_falls_back_to_unauthorized() {
    let app = TestApp::spawn().await;
    let (user, _) = app.user_with_token("mallory", user_type::USER).await;
    let (_, session) = app.sign_in(&user).await;

    let forged = JwtService::new("some-other-secret-entirely-0000000000", None)
        .issue(&Claims::new(user.id, "admin", "admin", "admin", session.id))
        .unwrap();

    // Public routes still work, protected ones are denied, never 401.
    let (status, _) = app.get("/healthz", Some(&forged)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/v1/user/list", Some(&forged)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_garbage_bearer_is_unauthorized_role() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/v1/tweet/list", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/healthz", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_inactive_session_is_rejected_even_for_admins() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user("root", user_type::ADMIN).await;
    let (token, session) = app.sign_in(&admin).await;

    let (status, _) = app.get("/v1/user/list", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    app.store
        .update_session(SessionUpdate {
            id: session.id,
            ip_address: session.ip_address.clone(),
            is_active: false,
        })
        .await
        .unwrap();

    let (status, _) = app.get("/v1/user/list", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // Also on routes the policy opens to everyone.
    let (status, _) = app.get("/healthz", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_session_is_rejected() {
    let app = TestApp::spawn().await;
    let (user, _) = app.user_with_token("alice", user_type::USER).await;
    let (token, session) = app.sign_in(&user).await;

    app.store.delete_session(session.id).await.unwrap();

    let (status, _) = app.get("/v1/tweet/list", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_session_is_rejected() {
    let app = TestApp::spawn().await;
    let user = app.seed_user("alice", user_type::USER).await;

    let token = app
        .state
        .jwt
        .issue(&Claims::new(user.id, "user", "user", "web", Uuid::new_v4()))
        .unwrap();

    let (status, _) = app.get("/v1/tweet/list", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_policy_separates_users_from_admins() {
    let app = TestApp::spawn().await;
    let (_, user_token) = app.user_with_token("alice", user_type::USER).await;
    let (_, admin_token) = app.user_with_token("root", user_type::ADMIN).await;

    let (status, _) = app
        .post("/v1/tag", Some(&user_token), json!({ "slug": "rust", "level": 1 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/v1/tag", Some(&admin_token), json!({ "slug": "rust", "level": 1 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "rust");

    let (status, body) = app.get("/v1/tag/list", Some(&user_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/v1/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let request = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-me");
    assert!(response.headers().contains_key(header::X_CONTENT_TYPE_OPTIONS));
}

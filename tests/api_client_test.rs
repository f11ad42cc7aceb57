//! REST client behavior over real HTTP.

mod common;

use std::sync::Arc;

use common::*;
use tether::adapters::mock::InMemorySecureStore;
use tether::auth::CredentialStore;
use tether::error::{AuthError, NetworkError, TetherError};
use tether::models::FollowEdge;
use wiremock::matchers::{body_json, body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_stores_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(serde_json::json!({
            "email": "ana@example.com",
            "password": "hunter2",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("at-1", "rt-1", 900)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySecureStore::new());
    let api = api_for(&server, store.clone());

    let credential = api.login("ana@example.com", "hunter2").await.unwrap();
    assert_eq!(credential.access_token, "at-1");
    assert_eq!(credential.user_id.as_deref(), Some(TEST_USER_ID));

    let stored = CredentialStore::new(store).load_credential().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "at-1");
    assert_eq!(stored.refresh_token.as_deref(), Some("rt-1"));
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"message": "Invalid email or password"})),
        )
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySecureStore::new());
    let api = api_for(&server, store.clone());

    let err = api.login("ana@example.com", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        TetherError::Auth(AuthError::InvalidCredentials { ref message })
            if message == "Invalid email or password"
    ));
    assert!(CredentialStore::new(store).load_credential().await.unwrap().is_none());
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", format!("Bearer {}", TEST_ACCESS_TOKEN).as_str()))
        .and(body_json(serde_json::json!({"refresh_token": TEST_REFRESH_TOKEN})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with(&signed_in_credential()).await;
    let api = api_for(&server, store.clone());

    api.logout().await.unwrap();
    assert!(CredentialStore::new(store).load_credential().await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_keeps_old_refresh_token_when_not_rotated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "at-2",
            "expiresIn": 600,
        })))
        .mount(&server)
        .await;

    let api = api_for(&server, Arc::new(InMemorySecureStore::new()));
    let credential = api.refresh("rt-original").await.unwrap();

    assert_eq!(credential.access_token, "at-2");
    assert_eq!(credential.refresh_token.as_deref(), Some("rt-original"));
}

#[tokio::test]
async fn test_refresh_forbidden_requires_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let api = api_for(&server, Arc::new(InMemorySecureStore::new()));
    let err = api.refresh("rt").await.unwrap_err();
    assert!(matches!(
        err,
        TetherError::Auth(AuthError::RefreshTokenInvalid { .. })
    ));
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn test_actions_without_session_send_nothing() {
    let server = MockServer::start().await;
    let api = api_for(&server, Arc::new(InMemorySecureStore::new()));

    let err = api
        .follow(&FollowEdge::user("me", "someone"))
        .await
        .unwrap_err();
    assert!(matches!(err, TetherError::Auth(AuthError::NotAuthenticated)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_team_follow_path_and_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/teams/t%201/follow"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let api = api_for(&server, store_with(&signed_in_credential()).await);
    let err = api
        .follow(&FollowEdge::team(TEST_USER_ID, "t 1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TetherError::Network(NetworkError::RateLimited {
            retry_after_secs: Some(12)
        })
    ));
}

#[tokio::test]
async fn test_change_password_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/change-password"))
        .and(body_json(serde_json::json!({
            "current_password": "old",
            "new_password": "short",
        })))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(serde_json::json!({"error": "Password too short"})),
        )
        .mount(&server)
        .await;

    let api = api_for(&server, store_with(&signed_in_credential()).await);
    let err = api.change_password("old", "short").await.unwrap_err();
    assert!(matches!(
        err,
        TetherError::Auth(AuthError::InvalidCredentials { ref message }) if message == "Password too short"
    ));
}

#[tokio::test]
async fn test_register_push_token_caches_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notifications/push-token"))
        .and(body_json(serde_json::json!({"token": "ExponentPushToken[xyz]"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with(&signed_in_credential()).await;
    let api = api_for(&server, store.clone());

    api.register_push_token("ExponentPushToken[xyz]").await.unwrap();
    assert_eq!(
        CredentialStore::new(store).push_token().await.unwrap().as_deref(),
        Some("ExponentPushToken[xyz]")
    );
}

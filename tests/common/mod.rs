//! Common test utilities for integration tests.
//!
//! Fixtures for signed-in stores, sessions pointed at a wiremock server,
//! and canned backend responses.
//!
//! # Example
//!
//! ```ignore
//! mod common;
//! use common::*;
//!
//! let server = MockServer::start().await;
//! let (session, store) = session_for(&server, signed_in_credential()).await;
//! ```

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tether::adapters::mock::InMemorySecureStore;
use tether::adapters::ReqwestHttpClient;
use tether::auth::{ApiClient, Credential, CredentialStore};
use tether::config::ClientConfig;
use tether::session::Session;
use wiremock::MockServer;

pub const TEST_USER_ID: &str = "user-123";
pub const TEST_ACCESS_TOKEN: &str = "test-access-token-12345";
pub const TEST_REFRESH_TOKEN: &str = "test-refresh-token-67890";

/// Credential that stays valid for the whole test run.
pub fn signed_in_credential() -> Credential {
    Credential::new(TEST_ACCESS_TOKEN, Utc::now() + chrono::Duration::hours(1))
        .with_refresh_token(TEST_REFRESH_TOKEN)
        .with_user_id(TEST_USER_ID)
}

/// Credential expiring `expires_in` from now.
pub fn credential_expiring_in(expires_in: chrono::Duration) -> Credential {
    Credential::new(TEST_ACCESS_TOKEN, Utc::now() + expires_in)
        .with_refresh_token(TEST_REFRESH_TOKEN)
        .with_user_id(TEST_USER_ID)
}

/// In-memory store holding `credential`.
pub async fn store_with(credential: &Credential) -> Arc<InMemorySecureStore> {
    let store = Arc::new(InMemorySecureStore::new());
    CredentialStore::new(store.clone())
        .save_credential(credential)
        .await
        .expect("in-memory store accepts writes");
    store
}

/// Config pointed at `server` with a short refresh buffer.
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri())
        .expect("wiremock uri is a valid URL")
        .with_refresh_buffer(Duration::from_secs(300))
        .with_check_interval(Duration::from_secs(60))
}

/// Session against `server` over real HTTP, with `credential` stored.
pub async fn session_for(
    server: &MockServer,
    credential: Credential,
) -> (Session, Arc<InMemorySecureStore>) {
    let store = store_with(&credential).await;
    let session = Session::from_parts(
        config_for(server),
        store.clone(),
        Arc::new(ReqwestHttpClient::new()),
        None,
    );
    (session, store)
}

/// Bare API client against `server` over real HTTP.
pub fn api_for(server: &MockServer, store: Arc<InMemorySecureStore>) -> ApiClient {
    ApiClient::new(
        server.uri(),
        Arc::new(ReqwestHttpClient::new()),
        CredentialStore::new(store),
    )
}

/// Body of a successful login or refresh.
pub fn token_body(access_token: &str, refresh_token: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": expires_in,
        "user_id": TEST_USER_ID,
    })
}

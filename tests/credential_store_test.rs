//! Credential persistence through the file-backed secure store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tether::adapters::mock::InMemorySecureStore;
use tether::adapters::FileSecureStore;
use tether::auth::{keys, Credential, CredentialStore};
use tether::traits::SecureStore;

const SAMPLES: &[&str] = &[
    "",
    "plain-ascii-token",
    "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.sig+/=",
    " leading and trailing spaces ",
    "quotes \" and \\ backslashes",
    "line\nbreaks\r\nand\ttabs",
    "Ünïcödé ✓ 日本語 🚀",
    "emoji only 👩‍👩‍👧‍👦",
    "{\"looks\": \"like json\"}",
];

fn file_store(dir: &TempDir) -> Arc<FileSecureStore> {
    Arc::new(FileSecureStore::at_path(dir.path().join("store.json")))
}

#[tokio::test]
async fn test_file_store_round_trips_arbitrary_strings() {
    let dir = TempDir::new().unwrap();
    let credentials = CredentialStore::new(file_store(&dir));

    for (i, value) in SAMPLES.iter().enumerate() {
        let key = format!("sample-{}", i);
        credentials.save_token(&key, value).await.unwrap();
        assert_eq!(
            credentials.get_token(&key).await.unwrap().as_deref(),
            Some(*value),
            "value {:?} changed in the store",
            value
        );
    }

    // Same values through a fresh handle on the same file
    let reopened = CredentialStore::new(file_store(&dir));
    for (i, value) in SAMPLES.iter().enumerate() {
        assert_eq!(
            reopened.get_token(&format!("sample-{}", i)).await.unwrap().as_deref(),
            Some(*value)
        );
    }
}

#[tokio::test]
async fn test_in_memory_store_round_trips_arbitrary_strings() {
    let credentials = CredentialStore::new(Arc::new(InMemorySecureStore::new()));
    for value in SAMPLES {
        credentials.save_token("k", value).await.unwrap();
        assert_eq!(credentials.get_token("k").await.unwrap().as_deref(), Some(*value));
    }
}

#[tokio::test]
async fn test_credential_survives_restart() {
    let dir = TempDir::new().unwrap();
    let expires_at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
    let credential = Credential::new("access-ü", expires_at)
        .with_refresh_token("refresh-✓")
        .with_user_id("42");

    CredentialStore::new(file_store(&dir))
        .save_credential(&credential)
        .await
        .unwrap();

    let loaded = CredentialStore::new(file_store(&dir))
        .load_credential()
        .await
        .unwrap();
    assert_eq!(loaded, Some(credential));
}

#[tokio::test]
async fn test_clear_keeps_push_token() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let credentials = CredentialStore::new(store.clone());

    credentials
        .save_credential(
            &Credential::new("a", Utc::now())
                .with_refresh_token("r")
                .with_user_id("u"),
        )
        .await
        .unwrap();
    credentials.set_push_token("ExponentPushToken[abc]").await.unwrap();

    credentials.clear().await.unwrap();

    assert_eq!(credentials.load_credential().await.unwrap(), None);
    for key in keys::SESSION {
        assert_eq!(store.get(key).await.unwrap(), None);
    }
    assert_eq!(
        credentials.push_token().await.unwrap().as_deref(),
        Some("ExponentPushToken[abc]")
    );
}

#[tokio::test]
async fn test_saving_without_refresh_token_removes_stale_one() {
    let dir = TempDir::new().unwrap();
    let credentials = CredentialStore::new(file_store(&dir));

    credentials
        .save_credential(&Credential::new("old", Utc::now()).with_refresh_token("stale"))
        .await
        .unwrap();
    credentials
        .save_credential(&Credential::new("new", Utc::now()))
        .await
        .unwrap();

    let loaded = credentials.load_credential().await.unwrap().unwrap();
    assert_eq!(loaded.access_token, "new");
    assert_eq!(loaded.refresh_token, None);
    assert!(!loaded.can_refresh());
}

//! Secure credential storage.
//!
//! [`CredentialStore`] is a thin, typed layer over a [`SecureStore`]. Every
//! value is kept as an opaque string under a fixed key so the backing store
//! never needs to know about tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use crate::traits::{SecureStore, StoreError};

/// Storage keys used by the credential store.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub const EXPIRES_AT: &str = "expires_at";
    pub const USER_ID: &str = "user_id";
    /// Cached push-notification token. Survives logout.
    pub const PUSH_TOKEN: &str = "push_token";

    /// Keys removed when the session ends.
    pub const SESSION: [&str; 4] = [ACCESS_TOKEN, REFRESH_TOKEN, EXPIRES_AT, USER_ID];
}

/// An authenticated session as persisted on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user_id: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
            user_id: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Whether a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether the access token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the access token expires within `window` of `now`.
    ///
    /// Already-expired tokens are within any window.
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expires_at - now < window
    }
}

/// Typed access to session secrets in a [`SecureStore`].
///
/// Cloning is cheap; clones share the same backing store.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecureStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Store an opaque value under `key`.
    pub async fn save_token(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store.set(key, value).await
    }

    /// Read the value under `key`, exactly as it was saved.
    pub async fn get_token(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.store.get(key).await
    }

    /// Remove the value under `key`.
    pub async fn delete_token(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await
    }

    /// Persist a full credential.
    ///
    /// The access token and its expiry go out in a single batch so that one
    /// is never stored without the other. Optional fields that are `None`
    /// are deleted afterwards so stale values from an earlier session do not
    /// linger.
    pub async fn save_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        let expires_at = credential.expires_at.timestamp_millis().to_string();
        let mut entries: Vec<(&str, &str)> = vec![
            (keys::ACCESS_TOKEN, credential.access_token.as_str()),
            (keys::EXPIRES_AT, expires_at.as_str()),
        ];
        if let Some(refresh) = credential.refresh_token.as_deref() {
            entries.push((keys::REFRESH_TOKEN, refresh));
        }
        if let Some(user_id) = credential.user_id.as_deref() {
            entries.push((keys::USER_ID, user_id));
        }
        self.store.set_many(&entries).await?;

        if credential.refresh_token.is_none() {
            self.store.delete(keys::REFRESH_TOKEN).await?;
        }
        if credential.user_id.is_none() {
            self.store.delete(keys::USER_ID).await?;
        }

        debug!(expires_at = %credential.expires_at, "Credential saved");
        Ok(())
    }

    /// Load the stored credential.
    ///
    /// Returns `Ok(None)` when there is no access token. A missing or
    /// unreadable expiry is treated as already expired.
    pub async fn load_credential(&self) -> Result<Option<Credential>, StoreError> {
        let access_token = match self.store.get(keys::ACCESS_TOKEN).await? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };

        let expires_at = self
            .store
            .get(keys::EXPIRES_AT)
            .await?
            .and_then(|raw| parse_expires_at(&raw))
            .unwrap_or(DateTime::UNIX_EPOCH);

        let refresh_token = self
            .store
            .get(keys::REFRESH_TOKEN)
            .await?
            .filter(|t| !t.is_empty());
        let user_id = self.store.get(keys::USER_ID).await?;

        Ok(Some(Credential {
            access_token,
            refresh_token,
            expires_at,
            user_id,
        }))
    }

    /// The current access token, if any.
    pub async fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .get(keys::ACCESS_TOKEN)
            .await?
            .filter(|t| !t.is_empty()))
    }

    /// Delete every session key. The push token is kept.
    pub async fn clear(&self) -> Result<(), StoreError> {
        for key in keys::SESSION {
            self.store.delete(key).await?;
        }
        debug!("Session credentials cleared");
        Ok(())
    }

    pub async fn push_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(keys::PUSH_TOKEN).await
    }

    pub async fn set_push_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(keys::PUSH_TOKEN, token).await
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

fn parse_expires_at(raw: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

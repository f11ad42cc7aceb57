//! Secure storage trait abstraction.
//!
//! Session secrets are kept as opaque strings under fixed keys. The trait
//! mirrors what platform secure storage offers: get, set and delete by key.

use async_trait::async_trait;

/// Secure storage errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Failed to read from storage
    ReadFailed(String),
    /// Failed to write to storage
    WriteFailed(String),
    /// Failed to delete from storage
    DeleteFailed(String),
    /// Stored data could not be decoded
    Corrupt(String),
    /// Storage location could not be determined
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::ReadFailed(msg) => write!(f, "Failed to read secure store: {}", msg),
            StoreError::WriteFailed(msg) => write!(f, "Failed to write secure store: {}", msg),
            StoreError::DeleteFailed(msg) => {
                write!(f, "Failed to delete from secure store: {}", msg)
            }
            StoreError::Corrupt(msg) => write!(f, "Secure store is corrupt: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Secure store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Trait for key-value secure storage.
///
/// Implementations include the file-backed production store and an
/// in-memory store for tests. Values are returned exactly as stored.
///
/// # Example
///
/// ```ignore
/// use tether::traits::SecureStore;
///
/// async fn remember<S: SecureStore>(store: &S) -> Result<(), StoreError> {
///     store.set("push_token", "ExponentPushToken[abc]").await?;
///     assert_eq!(store.get("push_token").await?.as_deref(), Some("ExponentPushToken[abc]"));
///     store.delete("push_token").await
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` if the key exists
    /// - `Ok(None)` if nothing is stored under the key
    /// - `Err(error)` if the storage could not be read
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Store several entries in one call.
    ///
    /// The default writes them one by one. Backends that can commit a batch
    /// atomically should override this.
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }
}

//! In-memory secure store for testing.
//!
//! Provides a [`SecureStore`] that keeps entries in memory, with switches
//! to make reads, writes or deletes fail.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{SecureStore, StoreError};

/// In-memory secure store for testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the code under test owns another.
///
/// # Example
///
/// ```ignore
/// use tether::adapters::mock::InMemorySecureStore;
/// use tether::traits::SecureStore;
///
/// let store = InMemorySecureStore::new();
/// store.set("access_token", "abc").await?;
/// assert_eq!(store.snapshot().get("access_token").map(String::as_str), Some("abc"));
///
/// store.set_fail_writes(true);
/// assert!(store.set("access_token", "def").await.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySecureStore {
    /// Stored entries
    entries: Arc<Mutex<HashMap<String, String>>>,
    /// Whether get should fail
    fail_reads: Arc<Mutex<bool>>,
    /// Whether set and set_many should fail
    fail_writes: Arc<Mutex<bool>>,
    /// Whether delete should fail
    fail_deletes: Arc<Mutex<bool>>,
    /// Number of set_many calls that succeeded
    batch_writes: Arc<Mutex<usize>>,
}

impl InMemorySecureStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.entries.lock().unwrap_or_else(|e| e.into_inner());
            for (k, v) in entries {
                map.insert(k.into(), v.into());
            }
        }
        store
    }

    /// Configure whether reads should fail.
    pub fn set_fail_reads(&self, should_fail: bool) {
        *self.fail_reads.lock().unwrap_or_else(|e| e.into_inner()) = should_fail;
    }

    /// Configure whether writes should fail.
    pub fn set_fail_writes(&self, should_fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = should_fail;
    }

    /// Configure whether deletes should fail.
    pub fn set_fail_deletes(&self, should_fail: bool) {
        *self.fail_deletes.lock().unwrap_or_else(|e| e.into_inner()) = should_fail;
    }

    /// Copy of all entries (for assertions).
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// How many batched writes have been committed.
    pub fn batch_writes(&self) -> usize {
        *self.batch_writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SecureStore for InMemorySecureStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if *self.fail_reads.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::ReadFailed("Mock read failure".to_string()));
        }
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::WriteFailed("Mock write failure".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if *self.fail_deletes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::DeleteFailed("Mock delete failure".to_string()));
        }
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::WriteFailed("Mock write failure".to_string()));
        }
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        *self.batch_writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

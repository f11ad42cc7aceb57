//! File-backed secure store adapter.
//!
//! Entries are kept as one JSON object in `~/.tether/secure-store.json`.
//! Every write replaces the file through a temp file and a rename, so a
//! crash mid-write leaves the previous contents in place.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::traits::{SecureStore, StoreError};

const STORE_DIR: &str = ".tether";
const STORE_FILE: &str = "secure-store.json";

type Entries = BTreeMap<String, String>;

/// [`SecureStore`] persisted to a JSON file readable only by its owner.
///
/// # Example
///
/// ```ignore
/// use tether::adapters::FileSecureStore;
/// use tether::traits::SecureStore;
///
/// let store = FileSecureStore::new()?;
/// store.set("access_token", "eyJ...").await?;
/// ```
#[derive(Debug)]
pub struct FileSecureStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileSecureStore {
    /// Store at the default location under the home directory.
    pub fn new() -> Result<Self, StoreError> {
        Self::default_path()
            .map(Self::at_path)
            .ok_or_else(|| StoreError::Unavailable("Failed to determine home directory".to_string()))
    }

    /// Store at an explicit path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `~/.tether/secure-store.json`, if the home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(STORE_DIR).join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(StoreError::ReadFailed(e.to_string())),
        };
        if bytes.is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        let write_failed = |e: std::io::Error| StoreError::WriteFailed(e.to_string());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(write_failed)?;
        }

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(write_failed)?;
        restrict_permissions(&tmp).await.map_err(write_failed)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_failed)?;

        debug!(path = %self.path.display(), entries = entries.len(), "Secure store written");
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_many(&[(key, value)]).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
            .await
            .map_err(|e| match e {
                StoreError::WriteFailed(msg) => StoreError::DeleteFailed(msg),
                other => other,
            })
    }

    async fn set_many(&self, new_entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value.to_string());
        }
        self.write_entries(&entries).await
    }
}

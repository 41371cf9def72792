// Credential Persistence
// Named string slots that outlive any single request or process

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Key/value store holding the persisted bearer credential
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, nothing survives a restart
#[derive(Default)]
pub struct MemoryCredentialStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot, e.g. with a token obtained elsewhere
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.slots.lock().insert(key.to_string(), value.to_string());
        store
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.slots.lock().remove(key);
        Ok(())
    }
}

/// JSON object on disk, one entry per key
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                StoreError::Credential(format!("{} is corrupt: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    async fn write_all(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let contents = serde_json::to_string_pretty(slots)
            .map_err(|e| StoreError::Credential(e.to_string()))?;

        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        debug!(path = %self.path.display(), entries = slots.len(), "Credential file written");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.read_all().await?;
        slots.insert(key.to_string(), value.to_string());
        self.write_all(&slots).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.read_all().await?;
        if slots.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&slots).await
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Credential(format!("{}: {}", path.display(), err))
}

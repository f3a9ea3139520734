//! Local persisted state.
//!
//! A single key, [`TRANSACTION_COUNT_KEY`], holds the last known record
//! count as a decimal string.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Storage key for the record count.
pub const TRANSACTION_COUNT_KEY: &str = "transactionCount";

/// Trait for count storage backends.
#[async_trait]
pub trait CountStore: Send + Sync {
    /// Load a raw value by key.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store a raw value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Load the stored record count.
    ///
    /// A value that is not a decimal integer is treated as absent.
    async fn load_count(&self) -> StorageResult<Option<u64>> {
        let Some(raw) = self.get(TRANSACTION_COUNT_KEY).await? else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(count) => Ok(Some(count)),
            Err(_) => {
                let err = StorageError::Parse {
                    key: TRANSACTION_COUNT_KEY.into(),
                    value: raw,
                };
                warn!(error = %err, "ignoring stored count");
                Ok(None)
            }
        }
    }

    /// Persist the record count.
    async fn save_count(&self, count: u64) -> StorageResult<()> {
        self.set(TRANSACTION_COUNT_KEY, &count.to_string()).await
    }
}

/// In-memory store. Not persistent across restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CountStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: one JSON object of string keys and values.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Create a store at the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Store in the default location (`~/.chainlog/state.json`).
    #[must_use]
    pub fn default_path() -> Self {
        Self::new(default_state_path())
    }

    /// File backing this store.
    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

/// Default state file path.
#[must_use]
pub fn default_state_path() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chainlog")
        .join("state.json")
}

#[async_trait]
impl CountStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.write().await;
        let mut values = match self.read_all().await {
            Ok(values) => values,
            Err(StorageError::Json(e)) => {
                warn!(error = %e, path = %self.path.display(), "discarding unreadable local state");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write beside the target and rename over it so readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(&values)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(key = %key, path = %self.path.display(), "saved local state");
        Ok(())
    }
}

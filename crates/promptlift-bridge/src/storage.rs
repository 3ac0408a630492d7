//! Durable key/value storage owned by the background side.
//!
//! The layout is a handful of named entries with no versioning:
//! `pendingPlatformInsertion`, `lastSelectedPlatform`, `userId` and
//! `sessionId`. Anything else found at startup is pruned.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::BridgeError;

pub const PENDING_INSERTION_KEY: &str = "pendingPlatformInsertion";
pub const LAST_SELECTED_PLATFORM_KEY: &str = "lastSelectedPlatform";
pub const USER_ID_KEY: &str = "userId";
pub const SESSION_ID_KEY: &str = "sessionId";

/// Every entry the engine reads or writes.
pub const KNOWN_KEYS: [&str; 4] = [
    PENDING_INSERTION_KEY,
    LAST_SELECTED_PLATFORM_KEY,
    USER_ID_KEY,
    SESSION_ID_KEY,
];

/// Durable key/value storage.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, BridgeError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), BridgeError>;

    async fn remove(&self, key: &str) -> Result<(), BridgeError>;

    async fn keys(&self) -> Result<Vec<String>, BridgeError>;
}

/// Remove entries that are not part of the storage layout.
///
/// Returns the removed keys.
pub async fn prune_unknown(store: &dyn DurableStore) -> Result<Vec<String>, BridgeError> {
    let mut removed = Vec::new();
    for key in store.keys().await? {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            store.remove(&key).await?;
            removed.push(key);
        }
    }
    if !removed.is_empty() {
        info!("Pruned {} unknown storage entries", removed.len());
    }
    Ok(removed)
}

/// In-memory store for testing.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, BridgeError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), BridgeError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), BridgeError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BridgeError> {
        let mut keys: Vec<_> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// File backed store.
///
/// All entries live in one JSON object. Every write replaces the file through
/// a temporary sibling and a rename, so a crash leaves either the old or the
/// new contents.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl FileStore {
    /// Open (or create) a store at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let entries = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Storage file {:?} is unreadable, starting empty: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("FileStore opened at {:?} with {} entries", path, entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<(), BridgeError> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| BridgeError::Storage(format!("rename {:?}: {}", tmp, e)))?;
        Ok(())
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, BridgeError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), BridgeError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), BridgeError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BridgeError> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;

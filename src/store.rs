use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::client::ConfigClient;
use crate::config::storage::{CONFIG_KEY, LINKS_KEY, SHOP_SOCIAL_KEY};
use crate::errors::ApiError;
use crate::models::{ConfigDoc, SocialMediaEntry, TelegramLinks};

/// Key-value storage capability behind the local persistence layer.
///
/// Injected into every component that persists state so tests can substitute
/// [`MemoryStorage`] for the real filesystem.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;
    fn remove(&self, key: &str) -> Result<(), ApiError>;
}

/// File-backed storage: one JSON file per key under a namespaced directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ApiError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| ApiError::Storage(format!("cannot create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        fs::write(self.path(key), value)
            .map_err(|e| ApiError::Storage(format!("cannot write {}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Storage(format!("cannot remove {}: {}", key, e))),
        }
    }
}

/// In-memory storage used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.inner
            .lock()
            .map_err(|_| ApiError::Storage("storage mutex poisoned".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.inner
            .lock()
            .map_err(|_| ApiError::Storage("storage mutex poisoned".into()))?
            .remove(key);
        Ok(())
    }
}

/// Outcome of a manual local→remote reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing flagged local; the remote copy is already authoritative.
    AlreadySynced,
    /// The local copy was pushed and the local flag cleared.
    Synced,
    /// The push failed; the local copy is left untouched.
    NotSynced,
}

/// Durable fallback copy of the full configuration document.
///
/// Exactly one authoritative copy of the document exists at any time: the
/// remote one, or, when the client is in local mode, the most recent local
/// copy stamped `_isLocal = true`.
pub struct LocalStore {
    backend: Arc<dyn StorageBackend>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.backend)
    }

    /// Seeds defaults if nothing is stored yet. Idempotent.
    pub fn init(&self) -> Result<(), ApiError> {
        if self.backend.get(CONFIG_KEY).is_none() {
            self.write(&ConfigDoc::defaults())?;
            log::info!("local store seeded with default config");
        }
        Ok(())
    }

    /// Stamps `_isLocal` / `_lastSaved` and writes the document.
    /// Returns the stamped copy actually persisted.
    pub fn save(&self, doc: &ConfigDoc) -> Result<ConfigDoc, ApiError> {
        let mut stamped = doc.clone();
        stamped.mark_local();
        self.write(&stamped)?;
        Ok(stamped)
    }

    /// Returns the stored document, or `None` if absent or corrupt.
    /// Corrupt JSON is treated as absence and never propagated.
    pub fn load(&self) -> Option<ConfigDoc> {
        let raw = self.backend.get(CONFIG_KEY)?;
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => ConfigDoc::from_value(value),
            Err(e) => {
                log::warn!("local config is corrupt, treating as absent: {}", e);
                None
            }
        }
    }

    /// Removes the stored document and reseeds defaults.
    pub fn clear(&self) -> Result<(), ApiError> {
        self.backend.remove(CONFIG_KEY)?;
        self.write(&ConfigDoc::defaults())?;
        log::info!("local store cleared and reseeded");
        Ok(())
    }

    /// Pushes a local-flagged document to the remote service once.
    ///
    /// Operator-triggered only: this is the manual reconciliation path, not
    /// an automatic one. On success the local flag is cleared and
    /// `_lastSynced` stamped; on failure the document is left unchanged.
    pub async fn sync_with_server(&self, client: &ConfigClient) -> Result<SyncOutcome, ApiError> {
        let Some(mut doc) = self.load() else {
            return Ok(SyncOutcome::AlreadySynced);
        };
        if !doc.is_local() {
            return Ok(SyncOutcome::AlreadySynced);
        }

        match client.push_config(&doc).await {
            Ok(()) => {
                doc.mark_synced();
                self.write(&doc)?;
                log::info!("local config pushed to server");
                Ok(SyncOutcome::Synced)
            }
            Err(e) => {
                log::warn!("local config not yet synced: {}", e);
                Ok(SyncOutcome::NotSynced)
            }
        }
    }

    fn write(&self, doc: &ConfigDoc) -> Result<(), ApiError> {
        let raw = serde_json::to_string_pretty(doc)
            .map_err(|e| ApiError::Storage(format!("cannot serialize config: {}", e)))?;
        self.backend.set(CONFIG_KEY, &raw)
    }
}

/// Reads the poller's cached two-URL record.
pub fn load_cached_links(backend: &dyn StorageBackend) -> Option<TelegramLinks> {
    let raw = backend.get(LINKS_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(links) => Some(links),
        Err(e) => {
            log::warn!("cached telegram links are corrupt, ignoring: {}", e);
            None
        }
    }
}

/// Overwrites the poller's cached two-URL record.
pub fn store_cached_links(
    backend: &dyn StorageBackend,
    links: &TelegramLinks,
) -> Result<(), ApiError> {
    let raw = serde_json::to_string(links)
        .map_err(|e| ApiError::Storage(format!("cannot serialize links: {}", e)))?;
    backend.set(LINKS_KEY, &raw)
}

/// Reads the cached shop-footer social entries, written on every successful
/// shop-social update so public pages render without a remote round trip.
pub fn load_cached_shop_social(backend: &dyn StorageBackend) -> Option<Vec<SocialMediaEntry>> {
    let raw = backend.get(SHOP_SOCIAL_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(list) => Some(list),
        Err(e) => {
            log::warn!("cached shop social list is corrupt, ignoring: {}", e);
            None
        }
    }
}

/// Overwrites the cached shop-footer social entries.
pub fn store_cached_shop_social(
    backend: &dyn StorageBackend,
    list: &[SocialMediaEntry],
) -> Result<(), ApiError> {
    let raw = serde_json::to_string(list)
        .map_err(|e| ApiError::Storage(format!("cannot serialize shop social list: {}", e)))?;
    backend.set(SHOP_SOCIAL_KEY, &raw)
}

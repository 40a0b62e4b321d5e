//! # Persisted Session Store
//!
//! Key-value persistence for the wallet session, the analogue of the
//! browser's local storage. Two keys are used by the connector:
//!
//! ```text
//! walletConnected  "true" while a session exists
//! walletAddress    0x-prefixed address of the connected account
//! ```
//!
//! [`FileStore`] keeps the map in a single JSON file and rewrites the whole
//! file on every mutation; there is no partial-write window because writes
//! go through a truncating `fs::write`. [`MemoryStore`] backs tests.
//!
//! Store failures are reported to the caller, never panicked on.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

/// Store key for the connected flag ("true" when connected).
pub const KEY_CONNECTED: &str = "walletConnected";
/// Store key for the connected account address.
pub const KEY_ADDRESS: &str = "walletAddress";

/// Errors from session persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure (read, write, create parent).
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session file exists but does not parse as a string map.
    #[error("session store corrupt: {0}")]
    Corrupt(String),
}

// ════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// String key-value persistence for session state.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ════════════════════════════════════════════════════════════════════════════
// FILE STORE
// ════════════════════════════════════════════════════════════════════════════

/// JSON-file-backed session store.
pub struct FileStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or initialize) the store at `path`. A missing file is an empty
    /// store; an unparseable file is [`StoreError::Corrupt`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let cache = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    fn persist(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // to_string_pretty over a string map cannot fail.
        let body = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        fs::write(&self.path, body)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.cache.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.lock();
        cache.insert(key.to_string(), value.to_string());
        self.persist(&cache)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.lock();
        cache.remove(key);
        self.persist(&cache)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MEMORY STORE
// ════════════════════════════════════════════════════════════════════════════

/// In-memory session store for tests.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the whole map, for asserting a store was left untouched.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.map.lock().clone()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.map.lock().remove(key);
        Ok(())
    }
}

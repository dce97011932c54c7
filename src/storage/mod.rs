//! Storage Abstraction Layer
//!
//! Durable per-device key/value storage for the journey:
//! - Native: one file per key under the user's local data directory
//! - WASM: the browser's `localStorage` via JavaScript FFI
//! - Memory: in-process map (tests, or hosts without durable storage)
//!
//! Only the current stage index is persisted. Every failure is logged and
//! treated as "nothing stored"; the journey never stops because of storage.

#[cfg(not(target_arch = "wasm32"))]
pub mod local;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::collections::HashMap;

pub use crate::error::StorageError;
#[cfg(not(target_arch = "wasm32"))]
pub use local::FileStore;
#[cfg(target_arch = "wasm32")]
pub use web::WebStore;

use crate::journey::TOTAL_STAGES;

/// String key/value storage backend
pub trait KeyValueStore {
    /// Read a value. `Ok(None)` means the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Create or overwrite a value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Open the platform's durable store
///
/// Falls back to a [`MemoryStore`] when no durable location exists, so the
/// journey still runs (it just won't resume after a restart).
pub fn default_store() -> Box<dyn KeyValueStore> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        match FileStore::in_data_dir() {
            Some(store) => Box::new(store),
            None => {
                log::warn!("No local data directory, stage progress will not persist");
                Box::new(MemoryStore::new())
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        Box::new(WebStore::new())
    }
}

/// Persisted stage pointer
///
/// Stores the stage index as a decimal string under a single key.
pub struct StageStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl StageStore {
    pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Read the persisted stage
    ///
    /// Returns `None` if nothing is stored, the value doesn't parse, the
    /// index is out of range, or the backend failed.
    pub fn load(&self) -> Option<usize> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read stage from storage: {}", e);
                return None;
            }
        };

        match raw.trim().parse::<usize>() {
            Ok(stage) if stage < TOTAL_STAGES => Some(stage),
            Ok(stage) => {
                log::warn!("Ignoring persisted stage {} (out of range)", stage);
                None
            }
            Err(_) => {
                log::warn!("Ignoring unparsable persisted stage {:?}", raw);
                None
            }
        }
    }

    /// Persist the stage index
    pub fn save(&mut self, stage: usize) {
        if let Err(e) = self.backend.set(&self.key, &stage.to_string()) {
            log::warn!("Failed to persist stage {}: {}", stage, e);
        }
    }

    /// Remove the persisted stage
    pub fn clear(&mut self) {
        if let Err(e) = self.backend.remove(&self.key) {
            log::warn!("Failed to clear persisted stage: {}", e);
        }
    }

    /// Raw persisted string (for diagnostics and tests)
    pub fn raw(&self) -> Option<String> {
        self.backend.get(&self.key).ok().flatten()
    }
}

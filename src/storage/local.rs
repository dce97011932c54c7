//! Local filesystem storage backend
//!
//! Each key is a small text file under a base directory.
//! All operations complete immediately (synchronous).

use super::{KeyValueStore, StorageError};
use std::path::{Path, PathBuf};

/// Directory name under the platform data dir
const APP_DIR: &str = "airport-journey";

/// File-per-key storage backend
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory holding one file per key
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at a custom directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a store under the user's local data directory
    ///
    /// Returns `None` on hosts without one.
    pub fn in_data_dir() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::with_base_dir(dir.join(APP_DIR)))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a key onto a file path, keeping it inside the base directory
    fn resolve(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_dir.join(format!("{}.txt", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.resolve(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.resolve(key);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.resolve(key)) {
            Ok(()) => Ok(()),
            // Not found is OK for delete
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from(e)),
        }
    }
}

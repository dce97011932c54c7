//! Browser `localStorage` backend
//!
//! The page registers the `journey_storage_*` functions (see web/journey.js).

use super::{KeyValueStore, StorageError};

extern "C" {
    fn journey_storage_available() -> i32;
    /// Byte length of the stored value, or -1 when the key is absent
    fn journey_storage_len(key_ptr: *const u8, key_len: usize) -> i32;
    fn journey_storage_get(key_ptr: *const u8, key_len: usize, dest_ptr: *mut u8, max_len: usize) -> usize;
    fn journey_storage_set(key_ptr: *const u8, key_len: usize, value_ptr: *const u8, value_len: usize) -> i32;
    fn journey_storage_remove(key_ptr: *const u8, key_len: usize) -> i32;
}

/// `localStorage`-backed store
#[derive(Debug, Default)]
pub struct WebStore;

impl WebStore {
    pub fn new() -> Self {
        Self
    }

    fn available(&self) -> bool {
        unsafe { journey_storage_available() != 0 }
    }
}

impl KeyValueStore for WebStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if !self.available() {
            return Err(StorageError::Unavailable);
        }

        let len = unsafe { journey_storage_len(key.as_ptr(), key.len()) };
        if len < 0 {
            return Ok(None);
        }

        let mut buffer = vec![0u8; len as usize];
        let copied = unsafe {
            journey_storage_get(key.as_ptr(), key.len(), buffer.as_mut_ptr(), buffer.len())
        };
        buffer.truncate(copied);

        String::from_utf8(buffer)
            .map(Some)
            .map_err(|e| StorageError::Other(e.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.available() {
            return Err(StorageError::Unavailable);
        }
        let ok = unsafe { journey_storage_set(key.as_ptr(), key.len(), value.as_ptr(), value.len()) };
        if ok != 0 {
            Ok(())
        } else {
            Err(StorageError::Other(format!("localStorage rejected write of {}", key)))
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.available() {
            return Err(StorageError::Unavailable);
        }
        unsafe { journey_storage_remove(key.as_ptr(), key.len()) };
        Ok(())
    }
}

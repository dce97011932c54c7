//! Error types
//!
//! Every public operation of the journey core degrades instead of failing;
//! these errors only travel between a backend and the component that owns it,
//! where they are logged and turned into the documented fallback.

use thiserror::Error;

/// Audio graph, output and background-track errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// No output device is available on this host
    #[error("no audio output device available")]
    NoOutputDevice,
    /// The host refused to build or start the output stream
    #[error("audio stream error: {0}")]
    Stream(String),
    /// Fetching the background track failed
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// The background track could not be decoded
    #[error("decode failed: {0}")]
    Decode(String),
    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Operation requires an initialized audio graph
    #[error("audio graph not initialized")]
    NotInitialized,
}

/// Durable storage errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// Key or file not found
    #[error("not found: {0}")]
    NotFound(String),
    /// Permission denied
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Other I/O failure
    #[error("I/O error: {0}")]
    Io(String),
    /// No durable storage on this host
    #[error("storage unavailable")]
    Unavailable,
    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(e.to_string()),
            _ => StorageError::Io(e.to_string()),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_storage_kind() {
        let e = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(StorageError::from(e), StorageError::NotFound(_)));

        let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(StorageError::from(e), StorageError::PermissionDenied(_)));

        let e = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert_eq!(StorageError::from(e), StorageError::Io("disk on fire".into()));
    }
}

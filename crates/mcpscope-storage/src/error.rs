//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reading or writing a credential backend.
///
/// A missing key is not an error: `get` returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value is not the JSON its reader expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Keys name a single file, so they may not be empty, `.`/`..`, or
    /// contain a path separator.
    #[error("Invalid storage key {key:?}")]
    InvalidKey { key: String },

    /// An in-memory backend's lock was poisoned by a panicking writer.
    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StorageError {
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    pub(crate) fn poisoned(e: impl std::fmt::Display) -> Self {
        Self::LockPoisoned(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_names_the_key() {
        let err = StorageError::invalid_key("../tokens");
        assert_eq!(err.to_string(), "Invalid storage key \"../tokens\"");
    }

    #[test]
    fn test_wrapped_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(StorageError::from(io).to_string(), "IO error: denied");

        let json = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        assert!(StorageError::from(json).to_string().starts_with("JSON error"));
    }
}

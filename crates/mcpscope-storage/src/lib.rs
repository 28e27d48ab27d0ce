//! Storage layer for mcpscope.
//!
//! Credentials and in-flight authorization state are kept behind a small
//! string key-value abstraction with two backends:
//! - File storage, one JSON document per key (durable)
//! - In-memory storage (process lifetime, also used in tests)

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A string key-value store.
///
/// Implementations must be safe to share between tasks. Removing a key that
/// does not exist is not an error.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the raw value stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove the value stored under `key`.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// JSON helpers available on every [`Storage`].
#[async_trait]
pub trait StorageExt: Storage {
    /// Read and deserialize a value.
    async fn read_json<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and write a value.
    async fn write_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

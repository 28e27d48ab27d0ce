//! In-memory storage.

use crate::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-lifetime storage.
///
/// Backs the session-scoped slots (PKCE verifier, CSRF state, replay guard)
/// and doubles as the durable store in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(StorageError::poisoned)?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(StorageError::poisoned)?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(StorageError::poisoned)?;
        data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set("oauth_state", "abc").await.unwrap();
        assert_eq!(
            storage.get("oauth_state").await.unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(storage.len(), 1);

        storage.set("oauth_state", "def").await.unwrap();
        assert_eq!(
            storage.get("oauth_state").await.unwrap(),
            Some("def".to_string())
        );

        storage.remove("oauth_state").await.unwrap();
        assert!(storage.get("oauth_state").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let storage = MemoryStorage::default();
        assert!(storage.remove("nothing").await.is_ok());
    }
}

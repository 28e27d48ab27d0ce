//! File-based storage.
//!
//! Each key is stored as a separate file: `mcp_oauth_tokens` ->
//! `<root>/mcp_oauth_tokens.json`. Files are replaced atomically and, on
//! Unix, readable only by the owner since they hold bearer credentials.

use crate::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Durable storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key == "."
            || key == ".."
        {
            return Err(StorageError::invalid_key(key));
        }

        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Reading from storage");

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Writing to storage");

        fs::create_dir_all(&self.root).await?;

        // Write to a temp file first so readers never observe a partial value
        let temp_path = path.with_extension("json.tmp");
        write_private(&temp_path, value).await?;

        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Removing from storage");

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Create `path` owner-only before any byte of `value` lands in it.
async fn write_private(path: &Path, value: &str) -> StorageResult<()> {
    // A leftover temp file would keep its old mode
    match fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(value.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials"));

        storage.set("mcp_oauth_tokens", r#"{"a":1}"#).await.unwrap();
        assert_eq!(
            storage.get("mcp_oauth_tokens").await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
        assert!(dir
            .path()
            .join("credentials")
            .join("mcp_oauth_tokens.json")
            .exists());
    }

    #[tokio::test]
    async fn test_values_survive_new_instance() {
        let dir = tempdir().unwrap();
        FileStorage::new(dir.path())
            .set("mcp_oauth_tokens", "persisted")
            .await
            .unwrap();

        let reopened = FileStorage::new(dir.path());
        assert_eq!(
            reopened.get("mcp_oauth_tokens").await.unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.get("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.set("key", "value").await.unwrap();
        storage.remove("key").await.unwrap();
        assert!(storage.get("key").await.unwrap().is_none());

        // Removing twice is fine
        storage.remove("key").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        for key in ["", ".", "..", "a/b", "a\\b"] {
            let result = storage.set(key, "x").await;
            assert!(
                matches!(result, Err(StorageError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set("mcp_oauth_tokens", "secret").await.unwrap();

        let metadata = std::fs::metadata(dir.path().join("mcp_oauth_tokens.json")).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_temp_file_does_not_leak_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let stale = dir.path().join("mcp_oauth_tokens.json.tmp");
        std::fs::write(&stale, "old").unwrap();
        std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileStorage::new(dir.path());
        storage.set("mcp_oauth_tokens", "secret").await.unwrap();

        let path = dir.path().join("mcp_oauth_tokens.json");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "secret");
        assert_eq!(
            std::fs::metadata(&path).unwrap().permissions().mode() & 0o777,
            0o600
        );
        assert!(!stale.exists());
    }
}

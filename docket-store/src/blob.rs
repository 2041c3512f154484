//! Blob store implementations
//!
//! Uploaded content lives outside the record store, addressed by an opaque
//! locator. The filesystem variant names blobs with fresh UUIDs under a
//! configured root directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::BlobStore;

/// Filesystem blob store
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, locator: &str) -> StoreResult<PathBuf> {
        // Locators are UUIDs we minted ourselves; anything path-like is
        // rejected rather than resolved.
        if locator.contains('/') || locator.contains('\\') || locator.contains("..") {
            return Err(StoreError::Storage(format!("invalid locator: {locator}")));
        }
        Ok(self.root.join(locator))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, bytes: &[u8]) -> StoreResult<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::Storage(format!("create blob dir: {e}")))?;
        let locator = uuid::Uuid::new_v4().to_string();
        let path = self.root.join(&locator);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StoreError::Storage(format!("write blob {locator}: {e}")))?;
        Ok(locator)
    }

    async fn read(&self, locator: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(locator)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("blob {locator}")))
            }
            Err(e) => Err(StoreError::Storage(format!("read blob {locator}: {e}"))),
        }
    }

    async fn delete(&self, locator: &str) -> StoreResult<()> {
        let path = self.path_for(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!("delete blob {locator}: {e}"))),
        }
    }
}

impl FsBlobStore {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// In-memory blob store for tests
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, bytes: &[u8]) -> StoreResult<String> {
        let locator = uuid::Uuid::new_v4().to_string();
        self.blobs
            .write()
            .await
            .insert(locator.clone(), bytes.to_vec());
        Ok(locator)
    }

    async fn read(&self, locator: &str) -> StoreResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(locator)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("blob {locator}")))
    }

    async fn delete(&self, locator: &str) -> StoreResult<()> {
        self.blobs.write().await.remove(locator);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));

        let locator = store.store(b"blob bytes").await.unwrap();
        assert_eq!(store.read(&locator).await.unwrap(), b"blob bytes");

        store.delete(&locator).await.unwrap();
        assert!(matches!(
            store.read(&locator).await.unwrap_err(),
            StoreError::NotFound(_)
        ));

        // Deleting again is a no-op, not an error.
        store.delete(&locator).await.unwrap();
    }

    #[tokio::test]
    async fn fs_store_rejects_path_like_locators() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));
        assert!(store.read("../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        let locator = store.store(b"data").await.unwrap();
        assert_eq!(store.read(&locator).await.unwrap(), b"data");
        store.delete(&locator).await.unwrap();
        assert!(store.is_empty().await);
    }
}

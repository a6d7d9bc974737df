//! In-memory blob store

use crate::error::{Error, Result};
use crate::storage::blob::{common_prefixes, BlobItem, BlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Container {
    exists: bool,
    blobs: BTreeMap<String, Bytes>,
}

/// Blob container held entirely in memory
///
/// Useful for tests and for embedding a feed that is produced in-process.
/// Blobs can be added while a reader is running, which mirrors a feed that is
/// still being appended to.
pub struct InMemoryBlobStore {
    address: String,
    container: RwLock<Container>,
}

impl InMemoryBlobStore {
    /// Create an empty, existing container
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            container: RwLock::new(Container {
                exists: true,
                blobs: BTreeMap::new(),
            }),
        }
    }

    /// Create a handle to a container that does not exist yet
    pub fn missing(address: impl Into<String>) -> Self {
        let store = Self::new(address);
        store.write().exists = false;
        store
    }

    /// Create the container if it is missing
    pub fn create(&self) {
        self.write().exists = true;
    }

    /// Write (or overwrite) a blob
    pub fn put(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.write().blobs.insert(name.into(), data.into());
    }

    /// Remove a blob, returning whether it existed
    pub fn remove(&self, name: &str) -> bool {
        self.write().blobs.remove(name).is_some()
    }

    /// Number of blobs currently stored
    pub fn len(&self) -> usize {
        self.read().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock only means a writer panicked mid-insert; the map itself is intact.
    fn read(&self) -> RwLockReadGuard<'_, Container> {
        self.container.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Container> {
        self.container.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn address(&self) -> &str {
        &self.address
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.read().exists)
    }

    async fn list_prefixes(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>> {
        let container = self.read();
        if !container.exists {
            return Ok(Vec::new());
        }
        Ok(common_prefixes(
            prefix,
            delimiter,
            container.blobs.keys().map(String::as_str),
        ))
    }

    async fn list_blobs(&self, prefix: &str) -> Result<Vec<BlobItem>> {
        let container = self.read();
        if !container.exists {
            return Ok(Vec::new());
        }
        Ok(container
            .blobs
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, data)| BlobItem {
                name: name.clone(),
                size: data.len() as u64,
            })
            .collect())
    }

    async fn download(&self, path: &str) -> Result<Bytes> {
        let container = self.read();
        if !container.exists {
            return Err(Error::BlobNotFound(path.to_string()));
        }
        container
            .blobs
            .get(path)
            .cloned()
            .ok_or_else(|| Error::BlobNotFound(path.to_string()))
    }
}

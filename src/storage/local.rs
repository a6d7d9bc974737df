//! Blob store backed by a local directory tree
//!
//! The directory plays the role of the container; blob names are paths
//! relative to it with `/` separators.

use crate::error::{Error, Result};
use crate::storage::blob::{common_prefixes, BlobItem, BlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Directory-backed blob container
pub struct LocalBlobStore {
    root: PathBuf,
    address: String,
}

impl LocalBlobStore {
    /// Open a container rooted at `root`; the directory does not need to exist yet
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let address = format!("file://{}", root.display());
        Self { root, address }
    }

    /// Directory this container lives in
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Storage(format!("invalid blob name: {name}")));
        }
        Ok(self.root.join(relative))
    }

    /// Walk the tree under the directory part of `prefix`, returning blob names
    async fn walk(&self, prefix: &str) -> Result<Vec<BlobItem>> {
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir_part)?
        };

        let mut items = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let name = self.blob_name(&path)?;
                    if name.starts_with(prefix) {
                        let size = entry.metadata().await?.len();
                        items.push(BlobItem { name, size });
                    }
                }
            }
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn blob_name(&self, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn address(&self) -> &str {
        &self.address
    }

    async fn exists(&self) -> Result<bool> {
        Ok(fs::try_exists(&self.root).await?)
    }

    async fn list_prefixes(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>> {
        let blobs = self.walk(prefix).await?;
        Ok(common_prefixes(
            prefix,
            delimiter,
            blobs.iter().map(|b| b.name.as_str()),
        ))
    }

    async fn list_blobs(&self, prefix: &str) -> Result<Vec<BlobItem>> {
        self.walk(prefix).await
    }

    async fn download(&self, path: &str) -> Result<Bytes> {
        let full = self.resolve(path)?;
        match fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobNotFound(path.to_string())),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(root: &Path, name: &str, data: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, data).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_store_listing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "idx/segments/2021/03/05/14/chunk-0.jsonl", "a").await;
        write(root, "idx/segments/2021/03/05/14/chunk-1.jsonl", "bb").await;
        write(root, "idx/segments/2022/01/01/00/chunk-0.jsonl", "c").await;
        write(root, "meta/segments.json", "{}").await;

        let store = LocalBlobStore::new(root);
        assert!(store.exists().await.unwrap());
        assert!(store.address().starts_with("file://"));

        let years = store.list_prefixes("idx/segments/", "/").await.unwrap();
        assert_eq!(years, vec!["idx/segments/2021/", "idx/segments/2022/"]);

        let chunks = store.list_blobs("idx/segments/2021/03/05/14/").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].name, "idx/segments/2021/03/05/14/chunk-1.jsonl");
        assert_eq!(chunks[1].size, 2);

        let data = store.download("meta/segments.json").await.unwrap();
        assert_eq!(&data[..], b"{}");
    }

    #[tokio::test]
    async fn test_local_store_missing_and_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path().join("absent"));
        assert!(!store.exists().await.unwrap());
        assert!(store.list_blobs("idx/").await.unwrap().is_empty());
        assert!(matches!(
            store.download("idx/x").await,
            Err(Error::BlobNotFound(_))
        ));
        assert!(matches!(
            store.download("../etc/passwd").await,
            Err(Error::Storage(_))
        ));
    }
}

//! Blob store capability consumed by the change feed reader

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeSet;

/// A listed blob and the metadata the reader cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Full blob name relative to the container
    pub name: String,
    /// Content length in bytes
    pub size: u64,
}

/// Trait for hierarchical blob containers holding a change feed
///
/// Implementations return listings in any order; the reader sorts them.
/// Failures are returned as-is and never retried by the reader.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stable address of the container, used to bind cursors to it
    fn address(&self) -> &str;

    /// Whether the container exists at all
    async fn exists(&self) -> Result<bool>;

    /// List the immediate child prefixes of `prefix`, split at `delimiter`
    async fn list_prefixes(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>>;

    /// List every blob below `prefix`, recursively
    async fn list_blobs(&self, prefix: &str) -> Result<Vec<BlobItem>>;

    /// Download the full contents of a blob
    async fn download(&self, path: &str) -> Result<Bytes>;
}

/// Collapse blob names below `prefix` to their first `delimiter`-terminated component
pub(crate) fn common_prefixes<'a>(
    prefix: &str,
    delimiter: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut prefixes = BTreeSet::new();
    for name in names {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        if let Some(idx) = rest.find(delimiter) {
            prefixes.insert(format!("{}{}", prefix, &rest[..idx + delimiter.len()]));
        }
    }
    prefixes.into_iter().collect()
}

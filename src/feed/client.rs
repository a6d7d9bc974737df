//! Entry point for reading a change feed container

use crate::config::ChangeFeedConfig;
use crate::core::cursor::ChangeFeedCursor;
use crate::core::temporal::{TimeWindow, Timestamp};
use crate::error::Result;
use crate::feed::reader::{fetch_last_consumable, ChangeFeed};
use crate::storage::{BlobStore, ChunkDecoder, JsonLinesDecoder};
use std::sync::Arc;

/// Builds readers over one change feed container
#[derive(Clone)]
pub struct ChangeFeedClient {
    store: Arc<dyn BlobStore>,
    decoder: Arc<dyn ChunkDecoder>,
    config: ChangeFeedConfig,
}

impl ChangeFeedClient {
    /// Create a client with an explicit decoder and configuration
    pub fn new(
        store: Arc<dyn BlobStore>,
        decoder: Arc<dyn ChunkDecoder>,
        config: ChangeFeedConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            decoder,
            config,
        })
    }

    /// Client using the JSON-lines decoder and default layout
    pub fn with_defaults(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            decoder: Arc::new(JsonLinesDecoder::new()),
            config: ChangeFeedConfig::default(),
        }
    }

    pub fn config(&self) -> &ChangeFeedConfig {
        &self.config
    }

    /// Configured default page size
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Reader over the whole feed
    pub fn get_changes(&self) -> ChangeFeed {
        self.get_changes_in_range(None, None)
    }

    /// Reader over segments between `start` (floored to the hour) and `end`
    /// (ceiled to the next hour)
    pub fn get_changes_in_range(&self, start: Option<Timestamp>, end: Option<Timestamp>) -> ChangeFeed {
        ChangeFeed::new(
            self.store.clone(),
            self.decoder.clone(),
            &self.config,
            TimeWindow::new(start, end),
        )
    }

    /// Reader resuming from a continuation token produced by [`ChangeFeedCursor::to_json`]
    pub fn get_changes_from(&self, continuation: &str) -> Result<ChangeFeed> {
        let cursor = ChangeFeedCursor::from_json(continuation)?;
        ChangeFeed::from_cursor(self.store.clone(), self.decoder.clone(), &self.config, cursor)
    }

    /// Current last-consumable bound, freshly read; `None` if the feed is not enabled
    pub async fn last_consumable(&self) -> Result<Option<Timestamp>> {
        if !self.store.exists().await? {
            return Ok(None);
        }
        fetch_last_consumable(self.store.as_ref(), &self.config.meta_path)
            .await
            .map(Some)
    }
}

//! Synchronous façade over [`ChangeFeed`]
//!
//! Drives the async reader on a private current-thread runtime, so there is a
//! single implementation of the reading logic. Must not be used from inside
//! an async runtime.

use crate::core::cursor::ChangeFeedCursor;
use crate::core::temporal::Timestamp;
use crate::error::Result;
use crate::feed::reader::{ChangeFeed, Page};
use tokio::runtime::{Builder, Runtime};

/// Blocking wrapper around a change feed reader
pub struct BlockingChangeFeed {
    feed: ChangeFeed,
    runtime: Runtime,
}

impl BlockingChangeFeed {
    pub fn new(feed: ChangeFeed) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { feed, runtime })
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.runtime.block_on(self.feed.initialize())
    }

    pub fn get_page(&mut self, page_size: usize) -> Result<Page> {
        self.runtime.block_on(self.feed.get_page(page_size))
    }

    pub fn has_next(&self) -> bool {
        self.feed.has_next()
    }

    pub fn last_consumable(&self) -> Option<Timestamp> {
        self.feed.last_consumable()
    }

    pub fn cursor(&self) -> Result<ChangeFeedCursor> {
        self.feed.cursor()
    }

    /// Give back the async reader
    pub fn into_inner(self) -> ChangeFeed {
        self.feed
    }
}

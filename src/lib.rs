//! Blob-Changefeed: resumable reader over a time-partitioned blob change feed
//!
//! A change feed is an append-only log of blob mutations stored as
//! `year / hour segment / chunk` blobs inside a container. This crate reads it
//! as one flat, ordered stream of pages.
//!
//! # Core Concepts
//!
//! - **Segments**: hour buckets of events, discovered by listing the container
//! - **Last-consumable bound**: segments after this time may still be written
//! - **Cursors**: compact JSON tokens that resume a reader at the next unread event
//! - **Collaborators**: [`storage::BlobStore`] and [`storage::ChunkDecoder`]
//!   are traits; in-memory, local-directory and JSON-lines versions are included
//!
//! # Example
//!
//! ```no_run
//! use blob_changefeed::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> blob_changefeed::error::Result<()> {
//! let store = Arc::new(LocalBlobStore::new("/data/account/$blobchangefeed"));
//! let client = ChangeFeedClient::with_defaults(store);
//!
//! let mut feed = client.get_changes();
//! while feed.has_next() {
//!     for event in feed.get_page(100).await? {
//!         println!("{} {}", event.event_type, event.subject);
//!     }
//! }
//!
//! // Later: pick up exactly where we stopped
//! let token = feed.cursor()?.to_json()?;
//! let mut resumed = client.get_changes_from(&token)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod feed;
pub mod storage;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::ChangeFeedConfig;
    pub use crate::core::*;
    pub use crate::error::{Error, Result};
    pub use crate::feed::*;
    pub use crate::storage::*;
}

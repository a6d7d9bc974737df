//! Resumption cursors
//!
//! A cursor is an immutable snapshot of a reader's position. It serializes to
//! a compact JSON document that callers hand back as a continuation token.

use crate::core::temporal::Timestamp;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Cursor layout version written by this crate
pub const CURSOR_VERSION: u32 = 1;

/// Position inside a single segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCursor {
    /// Segment prefix, e.g. `idx/segments/2021/03/05/14/`
    pub segment_path: String,
    /// Index into the segment's sorted chunk list
    pub chunk_index: usize,
    /// Number of events already consumed from that chunk
    pub event_offset: usize,
}

impl SegmentCursor {
    /// Cursor at the very start of a segment
    pub fn start_of(segment_path: impl Into<String>) -> Self {
        Self {
            segment_path: segment_path.into(),
            chunk_index: 0,
            event_offset: 0,
        }
    }
}

/// Position inside a whole change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedCursor {
    pub cursor_version: u32,
    /// Stable hash of the container address the cursor was taken from
    pub container_hash: u64,
    /// Hour-normalized end of the read window, if one was given
    pub end_time: Option<Timestamp>,
    pub segment_cursor: SegmentCursor,
}

impl ChangeFeedCursor {
    pub fn new(container_hash: u64, end_time: Option<Timestamp>, segment_cursor: SegmentCursor) -> Self {
        Self {
            cursor_version: CURSOR_VERSION,
            container_hash,
            end_time,
            segment_cursor,
        }
    }

    /// Serialize to a continuation token
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a continuation token
    pub fn from_json(token: &str) -> Result<Self> {
        let cursor: Self = serde_json::from_str(token)
            .map_err(|e| Error::InvalidCursor(e.to_string()))?;
        if cursor.cursor_version != CURSOR_VERSION {
            return Err(Error::InvalidCursor(format!(
                "unsupported cursor version {}",
                cursor.cursor_version
            )));
        }
        Ok(cursor)
    }

    /// Check that this cursor was taken against the container at `address`
    pub fn validate_for(&self, address: &str) -> Result<()> {
        let expected = container_hash(address);
        if self.container_hash != expected {
            return Err(Error::InvalidCursor(format!(
                "cursor belongs to container hash {}, not {}",
                self.container_hash, expected
            )));
        }
        Ok(())
    }
}

/// Stable 64-bit identity of a container address (first 8 bytes of SHA-256)
pub fn container_hash(address: &str) -> u64 {
    let digest = Sha256::digest(address.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

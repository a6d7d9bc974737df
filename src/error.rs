//! Error types for the change feed reader

use thiserror::Error;

/// Result type alias for change feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the change feed reader
#[derive(Error, Debug)]
pub enum Error {
    /// The change feed container does not exist (never enabled, or still provisioning)
    #[error("Change feed is not enabled on this account")]
    NotEnabled,

    /// A listed path does not follow the time-partitioned layout
    #[error("Malformed change feed path: {0}")]
    MalformedPath(String),

    /// `get_page` was called after `has_next` reported false
    #[error("Change feed stream is exhausted")]
    ExhaustedStream,

    /// A cursor cannot be used to resume against this feed
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// No segment has been opened yet, so there is no position to capture
    #[error("Change feed has no read position yet")]
    NotInitialized,

    /// A blob that was listed or named could not be found
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    /// Storage-related errors raised by a blob store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Chunk contents could not be decoded into events
    #[error("Decode error: {0}")]
    Decode(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

//! Error types for the audio cache

use cadence_core::{CadenceError, TrackId};
use thiserror::Error;

/// Audio cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Write extends past the track's known content length
    #[error("Write to {track_id} ends at byte {end}, past content length {content_length}")]
    BeyondContentLength {
        track_id: TrackId,
        end: u64,
        content_length: u64,
    },

    /// `offset + len` does not fit in a byte offset
    #[error("Write to {track_id} at offset {offset} overflows")]
    RangeOverflow { track_id: TrackId, offset: u64 },

    /// The cache lock was poisoned by a panicking thread
    #[error("Cache lock poisoned")]
    Poisoned,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Index (de)serialization failed
    #[error("Index error: {0}")]
    Index(#[from] serde_json::Error),
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<CacheError> for CadenceError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Io(e) => CadenceError::Io(e),
            other => CadenceError::Cache(other.to_string()),
        }
    }
}

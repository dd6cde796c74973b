//! Error types for playback management

use cadence_core::CadenceError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Index outside `[0, len)`; the queue is left untouched
    #[error("Index {index} out of bounds for queue of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// Operation not valid in the current engine state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Radio endpoint has neither a song nor a playlist
    #[error("Radio endpoint needs a video id or a playlist id")]
    InvalidEndpoint,

    /// Radio session was stopped or replaced before its first page arrived
    #[error("Radio session cancelled")]
    RadioCancelled,

    /// Audio pipeline rejected a command
    #[error("Audio pipeline error: {0}")]
    Pipeline(String),

    /// The playback session has shut down
    #[error("Playback session closed")]
    SessionClosed,

    /// Collaborator (catalog, store, cache) error
    #[error(transparent)]
    Core(#[from] CadenceError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Core error types for Cadence
use thiserror::Error;

use crate::types::{PlaylistId, TrackId};

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Core error type shared by the collaborator traits
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Remote catalog could not be reached or answered with an error
    #[error("Network error: {0}")]
    Network(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Track not found
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// Playlist not found
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(PlaylistId),

    /// Invalid input (bad index, missing parameter, malformed id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Database errors (for storage implementations)
    #[error("Database error: {0}")]
    Database(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CadenceError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether retrying the same call later may succeed.
    ///
    /// Network and I/O failures are transient; everything else is a
    /// caller-contract violation or a permanent condition.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io(_))
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for CadenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

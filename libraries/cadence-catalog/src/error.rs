//! Error types for the catalog client.

use cadence_core::CadenceError;
use thiserror::Error;

/// Errors that can occur when talking to the remote catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Catalog returned an error response
    #[error("Catalog error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Catalog is offline or unreachable
    #[error("Catalog unreachable: {0}")]
    Unreachable(String),

    /// Invalid catalog base URL
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse catalog response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Entity does not exist in the catalog
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Share URI carries neither a `list` nor a `v` parameter
    #[error("Missing URL parameters")]
    MissingParameters,

    /// Share URI could not be parsed
    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// Radio endpoint has neither a song nor a playlist
    #[error("Radio endpoint needs a video id or a playlist id")]
    InvalidEndpoint,
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<CatalogError> for CadenceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { entity, id } => CadenceError::not_found(entity, id),
            CatalogError::MissingParameters
            | CatalogError::InvalidUri(_)
            | CatalogError::InvalidEndpoint
            | CatalogError::InvalidUrl(_) => CadenceError::InvalidInput(err.to_string()),
            CatalogError::ParseError(msg) => CadenceError::Other(msg),
            other => CadenceError::Network(other.to_string()),
        }
    }
}

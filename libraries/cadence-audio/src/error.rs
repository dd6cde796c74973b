/// Audio pipeline errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Stream server answered with an error status
    #[error("Stream server returned status {0}")]
    Status(u16),

    /// Cache read or write failed
    #[error(transparent)]
    Cache(#[from] cadence_cache::CacheError),

    /// Container or codec could not be handled
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),

    /// Output rejected samples
    #[error("Output error: {0}")]
    Output(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AudioError::Symphonia(err.to_string())
    }
}

impl From<AudioError> for cadence_core::CadenceError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Http(e) => cadence_core::CadenceError::network(e.to_string()),
            AudioError::Io(e) => cadence_core::CadenceError::Io(e),
            other => cadence_core::CadenceError::Other(other.to_string()),
        }
    }
}

//! Configuration and wire types for the catalog API.

use cadence_core::RadioEndpoint;
use serde::{Deserialize, Serialize};

/// Configuration for connecting to the catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog API (e.g., "https://catalog.example.com/v1")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Accept-Language hint forwarded to the catalog
    pub language: Option<String>,
}

impl CatalogConfig {
    /// Create a config with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 30,
            language: None,
        }
    }
}

/// Request body for the radio continuation endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct NextRequest<'a> {
    pub endpoint: &'a RadioEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<&'a str>,
}

/// Error body returned by the catalog.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// Remote catalog trait
use crate::error::Result;
use crate::types::{CatalogSong, RadioEndpoint, RadioPage, SearchFilter, SearchPage, StreamInfo, TrackId};
use async_trait::async_trait;

/// Remote music catalog
///
/// Every call is fallible and returns a `Result` instead of panicking;
/// callers decide whether to retry (see `CadenceError::is_transient`).
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Search the catalog
    ///
    /// Pass the `continuation` of a previous page to fetch the next one.
    async fn search(
        &self,
        query: &str,
        filter: SearchFilter,
        continuation: Option<&str>,
    ) -> Result<SearchPage>;

    /// Look up a single song, `Ok(None)` if the catalog does not know it
    async fn song(&self, id: &TrackId) -> Result<Option<CatalogSong>>;

    /// Songs of a playlist, `Ok(None)` if the playlist does not exist
    async fn queue(&self, playlist_id: &str) -> Result<Option<Vec<CatalogSong>>>;

    /// Recommendation continuation for a radio seed
    async fn next(
        &self,
        endpoint: &RadioEndpoint,
        continuation: Option<&str>,
    ) -> Result<RadioPage>;

    /// Resolve where to stream a song's audio from
    async fn stream_info(&self, id: &TrackId) -> Result<StreamInfo>;
}

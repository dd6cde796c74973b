//! Share-link resolution.
//!
//! A shared link points either at a playlist (`list` query parameter) or at a
//! single song (`v`). `list` wins when both are present, so a link to a song
//! inside a playlist opens the whole playlist.

use crate::error::CatalogError;
use cadence_core::{CatalogService, CatalogSong, TrackId};
use tracing::debug;
use url::Url;

/// What a share link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareLink {
    Playlist(String),
    Song(TrackId),
}

impl ShareLink {
    /// Parse a share link.
    pub fn parse(uri: &str) -> Result<Self, CatalogError> {
        let url = Url::parse(uri)?;

        let mut list = None;
        let mut video = None;
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "list" if list.is_none() => list = Some(value.into_owned()),
                "v" if video.is_none() => video = Some(value.into_owned()),
                _ => {}
            }
        }

        list.map(ShareLink::Playlist)
            .or_else(|| video.map(|v| ShareLink::Song(TrackId::new(v))))
            .ok_or(CatalogError::MissingParameters)
    }

    /// Fetch the songs the link points at.
    ///
    /// A playlist or song the catalog does not know resolves to an empty list.
    pub async fn resolve(&self, catalog: &dyn CatalogService) -> cadence_core::Result<Vec<CatalogSong>> {
        match self {
            ShareLink::Playlist(playlist_id) => {
                debug!(playlist_id = %playlist_id, "Resolving playlist link");
                Ok(catalog.queue(playlist_id).await?.unwrap_or_default())
            }
            ShareLink::Song(id) => {
                debug!(track_id = %id, "Resolving song link");
                Ok(catalog.song(id).await?.into_iter().collect())
            }
        }
    }
}

/// Parse and resolve a share link in one step.
pub async fn resolve_uri(
    catalog: &dyn CatalogService,
    uri: &str,
) -> cadence_core::Result<Vec<CatalogSong>> {
    ShareLink::parse(uri)?.resolve(catalog).await
}

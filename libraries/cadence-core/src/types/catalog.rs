/// Remote catalog result types
use serde::{Deserialize, Serialize};

use super::TrackId;

/// Song metadata as returned by the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSong {
    /// Catalog id, becomes the library `TrackId`
    pub id: TrackId,

    /// Song title
    pub title: String,

    /// Artist credit as displayed
    #[serde(default)]
    pub artists_text: Option<String>,

    /// Duration text ("3:45")
    #[serde(default)]
    pub duration_text: Option<String>,

    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: Option<String>,

    /// Playlist the song was listed in, kept for radio seeding
    #[serde(default)]
    pub playlist_id: Option<String>,
}

impl CatalogSong {
    /// Create a song with only id and title set
    pub fn new(id: TrackId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            artists_text: None,
            duration_text: None,
            thumbnail_url: None,
            playlist_id: None,
        }
    }

    /// Radio endpoint seeded by this song
    pub fn radio_endpoint(&self) -> RadioEndpoint {
        RadioEndpoint::watch(self.id.clone(), self.playlist_id.clone())
    }
}

/// Album search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors_text: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Artist search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Endpoint for the artist's radio, when the catalog offers one
    #[serde(default)]
    pub radio_endpoint: Option<RadioEndpoint>,
}

/// Playlist search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPlaylist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub channel_text: Option<String>,
    #[serde(default)]
    pub song_count: Option<u32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Search result item, one variant per filter family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchItem {
    Song(CatalogSong),
    Video(CatalogSong),
    Album(CatalogAlbum),
    Artist(CatalogArtist),
    Playlist(CatalogPlaylist),
}

impl SearchItem {
    /// Playable song behind the item, for songs and videos
    pub fn as_song(&self) -> Option<&CatalogSong> {
        match self {
            SearchItem::Song(song) | SearchItem::Video(song) => Some(song),
            _ => None,
        }
    }
}

/// Search result filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    Song,
    Video,
    Album,
    Artist,
    CommunityPlaylist,
    FeaturedPlaylist,
}

impl SearchFilter {
    /// Query-string value understood by the catalog
    pub fn as_param(self) -> &'static str {
        match self {
            SearchFilter::Song => "song",
            SearchFilter::Video => "video",
            SearchFilter::Album => "album",
            SearchFilter::Artist => "artist",
            SearchFilter::CommunityPlaylist => "community_playlist",
            SearchFilter::FeaturedPlaylist => "featured_playlist",
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<SearchItem>,
    /// Token for the next page, `None` on the last page
    #[serde(default)]
    pub continuation: Option<String>,
}

/// Seed for a radio session
///
/// Either a watch endpoint (a song, optionally inside a playlist) or a bare
/// playlist endpoint. `params` is an opaque catalog hint passed through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RadioEndpoint {
    #[serde(default)]
    pub video_id: Option<TrackId>,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub params: Option<String>,
}

impl RadioEndpoint {
    /// Radio seeded by a song
    pub fn watch(video_id: TrackId, playlist_id: Option<String>) -> Self {
        Self {
            video_id: Some(video_id),
            playlist_id,
            params: None,
        }
    }

    /// Radio seeded by a playlist
    pub fn playlist(playlist_id: impl Into<String>) -> Self {
        Self {
            video_id: None,
            playlist_id: Some(playlist_id.into()),
            params: None,
        }
    }

    /// An endpoint needs at least a song or a playlist
    pub fn is_valid(&self) -> bool {
        self.video_id.is_some() || self.playlist_id.is_some()
    }
}

/// One page of radio continuation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RadioPage {
    pub items: Vec<CatalogSong>,
    #[serde(default)]
    pub continuation: Option<String>,
}

/// Where and how to fetch a song's audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Direct stream URL (supports HTTP range requests)
    pub url: String,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub loudness_db: Option<f32>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_validity() {
        assert!(RadioEndpoint::watch(TrackId::new("v1"), None).is_valid());
        assert!(RadioEndpoint::playlist("PL1").is_valid());

        let empty = RadioEndpoint {
            video_id: None,
            playlist_id: None,
            params: Some("x".to_string()),
        };
        assert!(!empty.is_valid());
    }

    #[test]
    fn search_item_tagged_json() {
        let json = r#"{"type":"song","id":"abc","title":"Hello"}"#;
        let item: SearchItem = serde_json::from_str(json).unwrap();

        let song = item.as_song().unwrap();
        assert_eq!(song.id.as_str(), "abc");
        assert!(song.artists_text.is_none());
    }

    #[test]
    fn song_radio_endpoint_keeps_playlist() {
        let mut song = CatalogSong::new(TrackId::new("v1"), "Song");
        song.playlist_id = Some("RDAMVM".to_string());

        let endpoint = song.radio_endpoint();
        assert_eq!(endpoint.video_id, Some(TrackId::new("v1")));
        assert_eq!(endpoint.playlist_id.as_deref(), Some("RDAMVM"));
    }
}

/// Playlist domain types
use serde::{Deserialize, Serialize};

use super::{PlaylistId, TrackId};

/// User playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Unique playlist identifier
    pub id: PlaylistId,

    /// Playlist name
    pub name: String,
}

/// Track membership in a playlist
///
/// Positions within one playlist are zero-based and gap-free; the playlist
/// owns the ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Playlist ID
    pub playlist_id: PlaylistId,

    /// Track ID
    pub track_id: TrackId,

    /// Position in the playlist (0-indexed)
    pub position: u32,
}

impl PlaylistEntry {
    /// Create a new playlist entry
    pub fn new(playlist_id: PlaylistId, track_id: TrackId, position: u32) -> Self {
        Self {
            playlist_id,
            track_id,
            position,
        }
    }
}

/// Summary row shown in playlist pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistPreview {
    /// The playlist
    pub playlist: Playlist,

    /// Number of entries
    pub track_count: u32,
}

//! Library store trait and change notifications

use crate::error::Result;
use crate::types::{Playlist, PlaylistId, PlaylistPreview, Track, TrackId};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Change notification published by a `LibraryStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryChange {
    /// A track row was inserted or updated
    TrackUpserted(TrackId),

    /// A track row was deleted
    TrackDeleted(TrackId),

    /// Playlists or their entries changed
    PlaylistsChanged,

    /// The subscriber fell behind and missed notifications; re-query everything
    Resync,
}

/// Scoped subscription to library changes
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct LibrarySubscription {
    receiver: broadcast::Receiver<LibraryChange>,
}

impl LibrarySubscription {
    /// Wrap a broadcast receiver
    pub fn new(receiver: broadcast::Receiver<LibraryChange>) -> Self {
        Self { receiver }
    }

    /// Wait for the next change
    ///
    /// Returns `None` once the store is gone. A lagging subscriber receives
    /// a single `LibraryChange::Resync` instead of the notifications it missed.
    pub async fn next(&mut self) -> Option<LibraryChange> {
        match self.receiver.recv().await {
            Ok(change) => Some(change),
            Err(broadcast::error::RecvError::Lagged(_)) => Some(LibraryChange::Resync),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

/// Local library persistence
///
/// Implementations must keep playlist positions contiguous and zero-based,
/// and publish a `LibraryChange` after every committed mutation.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    // ========================================================================
    // Tracks
    // ========================================================================

    /// Insert a track, ignoring it if the id already exists
    ///
    /// Returns `true` if a row was inserted.
    async fn insert_track(&self, track: &Track) -> Result<bool>;

    /// Replace the display metadata of an existing track
    async fn update_track(&self, track: &Track) -> Result<()>;

    /// Get track by ID
    async fn get_track(&self, id: &TrackId) -> Result<Option<Track>>;

    /// All tracks, most recently added first
    async fn get_all_tracks(&self) -> Result<Vec<Track>>;

    /// Delete a track together with every playlist membership
    async fn delete_track(&self, id: &TrackId) -> Result<()>;

    /// Flip the like flag, returning the updated track
    async fn toggle_like(&self, id: &TrackId) -> Result<Track>;

    /// Add listened time to the track's running total
    async fn add_play_time(&self, id: &TrackId, played_ms: u64) -> Result<()>;

    /// Record loudness and content length reported by the stream
    async fn update_stream_details(
        &self,
        id: &TrackId,
        loudness_db: Option<f32>,
        content_length: Option<u64>,
    ) -> Result<()>;

    // ========================================================================
    // Playlists
    // ========================================================================

    /// Create an empty playlist
    async fn create_playlist(&self, name: &str) -> Result<Playlist>;

    /// Delete a playlist and its entries
    async fn delete_playlist(&self, id: PlaylistId) -> Result<()>;

    /// Insert a track into a playlist
    ///
    /// `position: None` appends. Entries at or after an explicit position
    /// shift down by one.
    async fn insert_playlist_entry(
        &self,
        playlist_id: PlaylistId,
        track_id: &TrackId,
        position: Option<u32>,
    ) -> Result<()>;

    /// Remove the entry at `position`, shifting later entries up by one
    async fn remove_playlist_entry(&self, playlist_id: PlaylistId, position: u32) -> Result<()>;

    /// Tracks of a playlist in position order
    async fn playlist_tracks(&self, playlist_id: PlaylistId) -> Result<Vec<Track>>;

    /// Every playlist with its entry count
    async fn playlist_previews(&self) -> Result<Vec<PlaylistPreview>>;

    /// Create a playlist holding `tracks` at positions `0..n`
    ///
    /// Tracks are inserted first (insert-or-ignore).
    async fn import_playlist(&self, name: &str, tracks: &[Track]) -> Result<Playlist>;

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Subscribe to committed changes
    fn subscribe(&self) -> LibrarySubscription;
}

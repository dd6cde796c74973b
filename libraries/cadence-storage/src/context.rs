use crate::{playlists, tracks};
use async_trait::async_trait;
use cadence_core::{
    error::Result, LibraryChange, LibraryStore, LibrarySubscription, Playlist, PlaylistId,
    PlaylistPreview, Track, TrackId,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;

/// Buffered notifications per subscriber before it is told to resync
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Library store backed by `SQLite`
pub struct SqliteLibrary {
    pool: SqlitePool,
    changes: broadcast::Sender<LibraryChange>,
}

impl SqliteLibrary {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn notify(&self, change: LibraryChange) {
        tracing::trace!(?change, "Library changed");
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl LibraryStore for SqliteLibrary {
    // Tracks
    async fn insert_track(&self, track: &Track) -> Result<bool> {
        let inserted = tracks::insert(&self.pool, track).await?;
        if inserted {
            self.notify(LibraryChange::TrackUpserted(track.id.clone()));
        }
        Ok(inserted)
    }

    async fn update_track(&self, track: &Track) -> Result<()> {
        tracks::update(&self.pool, track).await?;
        self.notify(LibraryChange::TrackUpserted(track.id.clone()));
        Ok(())
    }

    async fn get_track(&self, id: &TrackId) -> Result<Option<Track>> {
        tracks::get_by_id(&self.pool, id).await
    }

    async fn get_all_tracks(&self) -> Result<Vec<Track>> {
        tracks::get_all(&self.pool).await
    }

    async fn delete_track(&self, id: &TrackId) -> Result<()> {
        tracks::delete(&self.pool, id).await?;
        tracing::info!(track_id = %id, "Deleted track from library");
        self.notify(LibraryChange::TrackDeleted(id.clone()));
        self.notify(LibraryChange::PlaylistsChanged);
        Ok(())
    }

    async fn toggle_like(&self, id: &TrackId) -> Result<Track> {
        let track = tracks::toggle_like(&self.pool, id).await?;
        self.notify(LibraryChange::TrackUpserted(id.clone()));
        Ok(track)
    }

    async fn add_play_time(&self, id: &TrackId, played_ms: u64) -> Result<()> {
        if played_ms == 0 {
            return Ok(());
        }
        tracks::add_play_time(&self.pool, id, played_ms).await?;
        self.notify(LibraryChange::TrackUpserted(id.clone()));
        Ok(())
    }

    async fn update_stream_details(
        &self,
        id: &TrackId,
        loudness_db: Option<f32>,
        content_length: Option<u64>,
    ) -> Result<()> {
        tracks::update_stream_details(&self.pool, id, loudness_db, content_length).await?;
        self.notify(LibraryChange::TrackUpserted(id.clone()));
        Ok(())
    }

    // Playlists
    async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        let playlist = playlists::create(&self.pool, name).await?;
        self.notify(LibraryChange::PlaylistsChanged);
        Ok(playlist)
    }

    async fn delete_playlist(&self, id: PlaylistId) -> Result<()> {
        playlists::delete(&self.pool, id).await?;
        self.notify(LibraryChange::PlaylistsChanged);
        Ok(())
    }

    async fn insert_playlist_entry(
        &self,
        playlist_id: PlaylistId,
        track_id: &TrackId,
        position: Option<u32>,
    ) -> Result<()> {
        playlists::insert_entry(&self.pool, playlist_id, track_id, position).await?;
        self.notify(LibraryChange::PlaylistsChanged);
        Ok(())
    }

    async fn remove_playlist_entry(&self, playlist_id: PlaylistId, position: u32) -> Result<()> {
        playlists::remove_entry(&self.pool, playlist_id, position).await?;
        self.notify(LibraryChange::PlaylistsChanged);
        Ok(())
    }

    async fn playlist_tracks(&self, playlist_id: PlaylistId) -> Result<Vec<Track>> {
        playlists::tracks(&self.pool, playlist_id).await
    }

    async fn playlist_previews(&self) -> Result<Vec<PlaylistPreview>> {
        playlists::previews(&self.pool).await
    }

    async fn import_playlist(&self, name: &str, tracks: &[Track]) -> Result<Playlist> {
        let playlist = playlists::import(&self.pool, name, tracks).await?;
        tracing::info!(playlist_id = playlist.id, tracks = tracks.len(), "Imported playlist");
        self.notify(LibraryChange::PlaylistsChanged);
        Ok(playlist)
    }

    fn subscribe(&self) -> LibrarySubscription {
        LibrarySubscription::new(self.changes.subscribe())
    }
}

//! Core types for playback management

use cadence_core::{CatalogSong, Track, TrackId};
use serde::{Deserialize, Serialize};

/// Playable entry in the play queue
///
/// Carries everything needed for display and loading, so queue operations
/// never touch storage or the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Track metadata
    pub track: Track,

    /// How the item entered the queue
    pub origin: QueueOrigin,
}

impl QueueItem {
    /// Item added directly by the user
    pub fn new(track: Track) -> Self {
        Self {
            track,
            origin: QueueOrigin::User,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: QueueOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn id(&self) -> &TrackId {
        &self.track.id
    }
}

impl From<Track> for QueueItem {
    fn from(track: Track) -> Self {
        Self::new(track)
    }
}

impl From<CatalogSong> for QueueItem {
    fn from(song: CatalogSong) -> Self {
        Self::new(Track::from(song))
    }
}

/// How an item entered the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueOrigin {
    /// Added by the user
    User,

    /// Part of a list the user started (playlist, album, search results)
    List { context: String },

    /// Appended by a radio session
    Radio { session: u64 },
}

/// Engine state
///
/// ```text
/// Idle ─▶ Buffering ─▶ Ready ─▶ Playing ⇄ Paused
///             ▲                    │
///             └──── next item ─────┴──▶ Ended
/// Error: reachable from any non-terminal state
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing loaded
    Idle,

    /// Loading the current item
    Buffering,

    /// Loaded, waiting for `play`
    Ready,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Queue exhausted
    Ended,

    /// The current item failed to load or decode
    Error,
}

impl PlaybackState {
    /// Whether the state is terminal for the current item
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackState::Ended | PlaybackState::Error)
    }
}

/// Configuration for the playback session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Reload attempts for a failing item before it is skipped (default: 1)
    pub max_retries: u32,

    /// Radio fetches the next page once this few items remain after the
    /// current one (default: 3)
    pub radio_low_watermark: usize,

    /// Apply loudness normalisation gain (default: true)
    pub normalize_loudness: bool,

    /// `skip_previous` restarts the current item when played past this
    /// many milliseconds (default: 3000)
    pub restart_threshold_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            radio_low_watermark: 3,
            normalize_loudness: true,
            restart_threshold_ms: 3000,
        }
    }
}

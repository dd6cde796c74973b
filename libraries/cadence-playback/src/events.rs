//! Playback Events
//!
//! Broadcast by the session for UI synchronisation. The authoritative state
//! is the `SessionSnapshot` watch channel; events describe transitions.

use crate::types::PlaybackState;
use cadence_core::TrackId;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Engine state changed
    StateChanged {
        /// The new playback state
        state: PlaybackState,
    },

    /// The current item changed (load started)
    TrackChanged {
        /// Queue index of the new current item
        index: usize,
        track_id: TrackId,
    },

    /// Items were added, removed or replaced
    QueueChanged {
        /// New queue length
        len: usize,
    },

    /// The current item failed
    TrackFailed {
        track_id: TrackId,
        reason: String,
        /// Whether the item will be reloaded (otherwise it is skipped)
        will_retry: bool,
    },

    /// Track finished playing naturally (reached end)
    TrackFinished {
        track_id: TrackId,
    },

    /// Radio appended recommendations
    RadioExtended {
        /// Items appended
        count: usize,
    },

    /// A radio fetch failed; the queue is unchanged
    RadioFailed {
        reason: String,
    },

    /// Playback reached the end of the queue
    QueueEnded,
}

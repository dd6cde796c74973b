//! Library bookkeeping for the playback session
//!
//! Writes are applied in order by one background task so that a track row
//! always exists before its stream details or play time are recorded.
//! Failures are logged and dropped; playback never waits on the library.

use cadence_core::{LibraryStore, Track, TrackId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug)]
pub(crate) enum LibraryWrite {
    /// Make sure the track is in the library
    Track(Box<Track>),
    StreamDetails {
        track_id: TrackId,
        loudness_db: Option<f32>,
        content_length: Option<u64>,
    },
    PlayTime {
        track_id: TrackId,
        played_ms: u64,
    },
}

/// Sends writes to the library task; a no-op without a store
pub(crate) struct LibraryRecorder {
    writes: Option<mpsc::UnboundedSender<LibraryWrite>>,
    task: Option<JoinHandle<()>>,
}

impl LibraryRecorder {
    pub(crate) fn spawn(store: Option<Arc<dyn LibraryStore>>) -> Self {
        let Some(store) = store else {
            return Self {
                writes: None,
                task: None,
            };
        };
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            writes: Some(tx),
            task: Some(tokio::spawn(apply_writes(store, rx))),
        }
    }

    /// Apply every queued write, then stop the library task
    pub(crate) async fn close(mut self) {
        self.writes.take();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Library task ended abnormally");
            }
        }
    }

    pub(crate) fn record(&self, write: LibraryWrite) {
        if let Some(writes) = &self.writes {
            let _ = writes.send(write);
        }
    }
}

async fn apply_writes(store: Arc<dyn LibraryStore>, mut rx: mpsc::UnboundedReceiver<LibraryWrite>) {
    while let Some(write) = rx.recv().await {
        let result = match &write {
            LibraryWrite::Track(track) => store.insert_track(track).await.map(|_| ()),
            LibraryWrite::StreamDetails {
                track_id,
                loudness_db,
                content_length,
            } => {
                store
                    .update_stream_details(track_id, *loudness_db, *content_length)
                    .await
            }
            LibraryWrite::PlayTime {
                track_id,
                played_ms,
            } => store.add_play_time(track_id, *played_ms).await,
        };

        if let Err(e) = result {
            debug!(?write, error = %e, "Library write failed");
        }
    }
}

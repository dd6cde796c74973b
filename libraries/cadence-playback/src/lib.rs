//! Cadence - Playback Session
//!
//! The playback core of Cadence: a play queue, an engine state machine
//! around one audio pipeline, an auto-extending radio, and the service
//! binder that applications talk to.
//!
//! This crate provides:
//! - Play queue with a cursor (`force_play`, `add_next`, `enqueue`, removal)
//! - Engine states (Idle, Buffering, Ready, Playing, Paused, Ended, Error)
//! - Retry-then-skip handling for failing items
//! - Loudness normalisation from catalog-reported loudness
//! - Radio continuation: recommendations appended as the queue runs low
//! - Play-time accounting into the library store
//!
//! # Architecture
//!
//! All session state lives on one actor task. [`PlayerService::spawn`]
//! starts it and returns a [`PlayerServiceBinder`]; intents are sent as
//! commands and applied in order. Stream resolution and radio fetches run
//! on their own tasks and are tagged (`load_id`, radio generation) so that
//! results for superseded work are discarded.
//!
//! Audio output is abstracted behind [`AudioPipeline`]; `cadence-audio`
//! provides the symphonia-based implementation.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_playback::{AudioPipeline, PlaybackConfig, PlayerService, QueueItem};
//! use cadence_cache::{AudioCache, CacheConfig};
//! use cadence_core::{CatalogService, Track, TrackId};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     pipeline: Box<dyn AudioPipeline>,
//! #     catalog: Arc<dyn CatalogService>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(AudioCache::new(CacheConfig::new("/tmp/cadence-cache"))?);
//! let binder = PlayerService::spawn(pipeline, catalog, cache, None, PlaybackConfig::default());
//!
//! let track = Track::new(TrackId::new("dQw4w9WgXcQ"), "Never Gonna Give You Up");
//! binder.player().force_play(QueueItem::new(track)).await?;
//!
//! let appended = binder.setup_radio(cadence_core::RadioEndpoint::watch(
//!     TrackId::new("dQw4w9WgXcQ"),
//!     None,
//! )).outcome().await?;
//! println!("radio queued {appended} songs");
//!
//! binder.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod events;
mod pipeline;
mod queue;
mod radio;
mod recorder;
mod service;
pub mod types;

pub use engine::{loudness_gain, EngineOutcome, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use pipeline::{AudioPipeline, LoadRequest, PipelineEvent, PipelineEventSender};
pub use queue::{PlayQueue, RemoveEffect};
pub use radio::{RadioController, RadioFetched, RadioStart};
pub use service::{Player, PlayerService, PlayerServiceBinder, SessionSnapshot};
pub use types::{PlaybackConfig, PlaybackState, QueueItem, QueueOrigin};

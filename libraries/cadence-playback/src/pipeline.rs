//! Audio pipeline abstraction
//!
//! The engine drives exactly one pipeline: a decoder plus output that plays
//! one resolved stream at a time. Pipelines report progress asynchronously
//! through [`PipelineEvent`]s, each tagged with the `load_id` of the load it
//! belongs to so that late events from a replaced load can be discarded.

use crate::error::Result;
use cadence_core::{StreamInfo, TrackId};
use std::time::Duration;
use tokio::sync::mpsc;

/// Sender half handed to a pipeline by the session
pub type PipelineEventSender = mpsc::UnboundedSender<PipelineEvent>;

/// A resolved stream to load
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Monotonic id of this load
    pub load_id: u64,

    pub track_id: TrackId,

    /// Where to read the audio from
    pub stream: StreamInfo,

    /// Linear gain in `[0, 1]`
    pub gain: f32,
}

/// Progress report from a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Waiting for data
    Buffering { load_id: u64 },

    /// Decodable; `duration` when the container knows it
    Ready {
        load_id: u64,
        duration: Option<Duration>,
    },

    /// Reached end of stream
    Ended { load_id: u64 },

    /// Load or decode failed
    Failed { load_id: u64, reason: String },
}

impl PipelineEvent {
    pub fn load_id(&self) -> u64 {
        match self {
            PipelineEvent::Buffering { load_id }
            | PipelineEvent::Ready { load_id, .. }
            | PipelineEvent::Ended { load_id }
            | PipelineEvent::Failed { load_id, .. } => *load_id,
        }
    }
}

/// Decode/output pipeline driven by the playback engine
///
/// Commands must not block: implementations hand work to their own thread
/// and report back through the attached event sender.
pub trait AudioPipeline: Send {
    /// Receive the channel used for reporting `PipelineEvent`s
    fn attach(&mut self, events: PipelineEventSender);

    /// Start loading a stream, replacing whatever was loaded
    fn load(&mut self, request: LoadRequest) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    /// Stop and unload
    fn stop(&mut self);

    /// Playback position within the loaded stream
    fn position(&self) -> Duration;

    /// Free decoder resources; the pipeline is not used afterwards
    fn release(&mut self);
}

//! Playback engine: the state machine around one audio pipeline

use crate::error::{PlaybackError, Result};
use crate::pipeline::{AudioPipeline, LoadRequest, PipelineEvent, PipelineEventSender};
use crate::types::PlaybackState;
use cadence_core::{StreamInfo, TrackId};
use std::time::Duration;
use tracing::{debug, warn};

/// Linear gain that normalises a stream reported at `loudness_db`
///
/// `10^(-dB/20)`, clamped to `[0, 1]` so normalisation only ever attenuates.
pub fn loudness_gain(loudness_db: Option<f32>) -> f32 {
    match loudness_db {
        Some(db) if db.is_finite() => 10f32.powf(-db / 20.0).clamp(0.0, 1.0),
        _ => 1.0,
    }
}

/// What a pipeline event meant to the session
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// Stale or redundant event
    Ignored,

    StateChanged(PlaybackState),

    /// The loaded item played to its end
    TrackEnded(TrackId),

    TrackFailed { track_id: TrackId, reason: String },
}

#[derive(Debug)]
struct ActiveLoad {
    load_id: u64,
    track_id: TrackId,
}

/// Engine owning the audio pipeline
pub struct PlaybackEngine {
    pipeline: Box<dyn AudioPipeline>,
    state: PlaybackState,
    next_load_id: u64,
    active: Option<ActiveLoad>,
    play_when_ready: bool,
    duration: Option<Duration>,
}

impl PlaybackEngine {
    pub fn new(mut pipeline: Box<dyn AudioPipeline>, events: PipelineEventSender) -> Self {
        pipeline.attach(events);
        Self {
            pipeline,
            state: PlaybackState::Idle,
            next_load_id: 1,
            active: None,
            play_when_ready: false,
            duration: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether playback should run once the current load is ready
    pub fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn position(&self) -> Duration {
        if self.active.is_some() {
            self.pipeline.position()
        } else {
            Duration::ZERO
        }
    }

    /// Id of the load currently in progress or playing
    pub fn active_load(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.load_id)
    }

    pub fn active_track(&self) -> Option<&TrackId> {
        self.active.as_ref().map(|a| &a.track_id)
    }

    /// Start loading `track_id`; the stream is supplied later by `start_stream`
    ///
    /// Any previous load is stopped and its events become stale.
    pub fn begin_load(&mut self, track_id: TrackId, play_when_ready: bool) -> u64 {
        if self.active.is_some() {
            self.pipeline.stop();
        }

        let load_id = self.next_load_id;
        self.next_load_id += 1;

        debug!(track_id = %track_id, load_id, play_when_ready, "Loading track");
        self.active = Some(ActiveLoad { load_id, track_id });
        self.play_when_ready = play_when_ready;
        self.duration = None;
        self.state = PlaybackState::Buffering;
        load_id
    }

    /// Hand the resolved stream for `load_id` to the pipeline
    ///
    /// Returns `Ok(false)` if the load was superseded meanwhile.
    pub fn start_stream(&mut self, load_id: u64, stream: StreamInfo, gain: f32) -> Result<bool> {
        let Some(active) = self.active.as_ref().filter(|a| a.load_id == load_id) else {
            return Ok(false);
        };

        self.pipeline.load(LoadRequest {
            load_id,
            track_id: active.track_id.clone(),
            stream,
            gain,
        })?;
        Ok(true)
    }

    /// Request playback
    ///
    /// Valid once something is loaded; from `Idle`, `Ended` and `Error` the
    /// session must reload first.
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Ready | PlaybackState::Paused => {
                self.pipeline.play();
                self.play_when_ready = true;
                self.state = PlaybackState::Playing;
                Ok(())
            }
            PlaybackState::Buffering => {
                self.play_when_ready = true;
                Ok(())
            }
            PlaybackState::Playing => Ok(()),
            state => Err(PlaybackError::InvalidOperation(format!(
                "cannot play from {:?}",
                state
            ))),
        }
    }

    /// Pause; valid only while `Playing` or `Buffering`
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => {
                self.pipeline.pause();
                self.play_when_ready = false;
                self.state = PlaybackState::Paused;
                Ok(())
            }
            PlaybackState::Buffering => {
                self.play_when_ready = false;
                Ok(())
            }
            state => Err(PlaybackError::InvalidOperation(format!(
                "cannot pause from {:?}",
                state
            ))),
        }
    }

    pub fn seek(&mut self, position: Duration) -> Result<()> {
        match self.state {
            PlaybackState::Ready
            | PlaybackState::Playing
            | PlaybackState::Paused
            | PlaybackState::Buffering
                if self.active.is_some() =>
            {
                self.pipeline.seek(position);
                Ok(())
            }
            state => Err(PlaybackError::InvalidOperation(format!(
                "cannot seek from {:?}",
                state
            ))),
        }
    }

    /// Stop and unload; back to `Idle`
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            self.pipeline.stop();
        }
        self.play_when_ready = false;
        self.state = PlaybackState::Idle;
    }

    /// Nothing loaded, but more items are on their way; holds `Buffering`
    /// and the play intent until the next `begin_load`
    pub fn begin_wait(&mut self, play_when_ready: bool) {
        self.stop();
        self.play_when_ready = play_when_ready;
        self.state = PlaybackState::Buffering;
    }

    /// Queue exhausted: unload and enter `Ended`
    pub fn end(&mut self) {
        self.stop();
        self.state = PlaybackState::Ended;
    }

    /// Mark the current load as failed without a pipeline event (e.g. the
    /// stream could not be resolved)
    pub fn fail(&mut self, load_id: u64) -> bool {
        if self.active_load() != Some(load_id) {
            return false;
        }
        self.pipeline.stop();
        self.state = PlaybackState::Error;
        true
    }

    /// Apply a pipeline event
    pub fn handle_event(&mut self, event: PipelineEvent) -> EngineOutcome {
        let Some(active) = self.active.as_ref().filter(|a| a.load_id == event.load_id()) else {
            debug!(load_id = event.load_id(), "Discarding stale pipeline event");
            return EngineOutcome::Ignored;
        };
        let track_id = active.track_id.clone();

        match event {
            PipelineEvent::Buffering { .. } => match self.state {
                PlaybackState::Playing => {
                    self.play_when_ready = true;
                    self.state = PlaybackState::Buffering;
                    EngineOutcome::StateChanged(self.state)
                }
                _ => EngineOutcome::Ignored,
            },
            PipelineEvent::Ready { duration, .. } => {
                if duration.is_some() {
                    self.duration = duration;
                }
                if self.state != PlaybackState::Buffering {
                    return EngineOutcome::Ignored;
                }
                if self.play_when_ready {
                    self.pipeline.play();
                    self.state = PlaybackState::Playing;
                } else {
                    self.state = PlaybackState::Ready;
                }
                EngineOutcome::StateChanged(self.state)
            }
            PipelineEvent::Ended { .. } => EngineOutcome::TrackEnded(track_id),
            PipelineEvent::Failed { reason, .. } => {
                warn!(track_id = %track_id, reason = %reason, "Pipeline failed");
                self.state = PlaybackState::Error;
                EngineOutcome::TrackFailed { track_id, reason }
            }
        }
    }

    /// Release the pipeline for good
    pub fn release(&mut self) {
        self.stop();
        self.pipeline.release();
    }
}

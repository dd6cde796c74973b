//! PCM outputs for the decoding pipeline

use crate::decoder::PcmChunk;
use crate::error::Result;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Receives decoded audio from the decoder thread
///
/// `write` may block; that is how the pipeline is paced.
pub trait PcmSink: Send {
    fn write(&mut self, chunk: &PcmChunk) -> Result<()>;

    /// Drop anything buffered (stop, seek, new load)
    fn reset(&mut self) {}
}

/// Discards audio at real-time speed
///
/// Used when there is no output device; playback progresses as it would
/// through a sound card.
#[derive(Debug)]
pub struct PacedSink {
    /// Wall-clock time at which the written audio would finish playing
    deadline: Option<Instant>,
}

impl PacedSink {
    pub fn new() -> Self {
        Self { deadline: None }
    }
}

impl Default for PacedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PcmSink for PacedSink {
    fn write(&mut self, chunk: &PcmChunk) -> Result<()> {
        if chunk.sample_rate == 0 {
            return Ok(());
        }
        let length = Duration::from_secs_f64(chunk.frames() as f64 / chunk.sample_rate as f64);
        let now = Instant::now();
        let start = self.deadline.filter(|d| *d > now).unwrap_or(now);
        let deadline = start + length;
        self.deadline = Some(deadline);

        // Keep one chunk of lead
        if let Some(wait) = start.checked_duration_since(now) {
            std::thread::sleep(wait);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.deadline = None;
    }
}

/// Keeps every sample written; shareable so the owner can inspect output
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Arc<Mutex<Vec<f32>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn samples(&self) -> Vec<f32> {
        self.samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl PcmSink for MemorySink {
    fn write(&mut self, chunk: &PcmChunk) -> Result<()> {
        if let Ok(mut samples) = self.samples.lock() {
            samples.extend_from_slice(&chunk.samples);
        }
        Ok(())
    }
}

//! Decoding pipeline: one decoder thread fed by crossbeam commands
//!
//! The playback engine talks to [`DecodingPipeline`] through the
//! `AudioPipeline` trait. Every command is forwarded to the decoder thread,
//! which opens streams through the cache, decodes with symphonia, applies the
//! load's gain, and writes to the sink. Progress goes back to the engine as
//! `PipelineEvent`s tagged with the load id.

use crate::decoder::StreamDecoder;
use crate::fetch::RangeFetcher;
use crate::sink::PcmSink;
use crate::stream::CachedStream;
use cadence_cache::AudioCache;
use cadence_playback::{
    AudioPipeline, LoadRequest, PipelineEvent, PipelineEventSender, PlaybackError,
};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Commands sent to the decoder thread
#[derive(Debug)]
enum DecoderCommand {
    Attach(PipelineEventSender),
    Load(LoadRequest),
    Play,
    Pause,
    Seek(Duration),
    Stop,
    Shutdown,
}

/// `AudioPipeline` decoding cached/streamed audio on its own thread
pub struct DecodingPipeline {
    commands: Sender<DecoderCommand>,
    position_ms: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl DecodingPipeline {
    pub fn new(
        cache: Arc<AudioCache>,
        fetcher: Arc<dyn RangeFetcher>,
        sink: Box<dyn PcmSink>,
    ) -> Self {
        let (commands, receiver) = unbounded();
        let position_ms = Arc::new(AtomicU64::new(0));

        let worker = DecoderThread {
            cache,
            fetcher,
            sink,
            commands: receiver,
            events: None,
            active: None,
            position_ms: Arc::clone(&position_ms),
        };
        let thread = thread::Builder::new()
            .name("cadence-decoder".into())
            .spawn(move || worker.run())
            .map_err(|e| error!(error = %e, "Failed to spawn decoder thread"))
            .ok();

        Self {
            commands,
            position_ms,
            thread,
        }
    }

    fn send(&self, command: DecoderCommand) -> cadence_playback::Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::Pipeline("decoder thread stopped".into()))
    }
}

impl AudioPipeline for DecodingPipeline {
    fn attach(&mut self, events: PipelineEventSender) {
        let _ = self.send(DecoderCommand::Attach(events));
    }

    fn load(&mut self, request: LoadRequest) -> cadence_playback::Result<()> {
        self.position_ms.store(0, Ordering::Relaxed);
        self.send(DecoderCommand::Load(request))
    }

    fn play(&mut self) {
        let _ = self.send(DecoderCommand::Play);
    }

    fn pause(&mut self) {
        let _ = self.send(DecoderCommand::Pause);
    }

    fn seek(&mut self, position: Duration) {
        self.position_ms
            .store(position.as_millis() as u64, Ordering::Relaxed);
        let _ = self.send(DecoderCommand::Seek(position));
    }

    fn stop(&mut self) {
        self.position_ms.store(0, Ordering::Relaxed);
        let _ = self.send(DecoderCommand::Stop);
    }

    fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms.load(Ordering::Relaxed))
    }

    fn release(&mut self) {
        let _ = self.send(DecoderCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Decoder thread panicked");
            }
        }
    }
}

impl Drop for DecodingPipeline {
    fn drop(&mut self) {
        self.release();
    }
}

struct ActiveStream {
    load_id: u64,
    decoder: StreamDecoder,
    gain: f32,
    playing: bool,
}

struct DecoderThread {
    cache: Arc<AudioCache>,
    fetcher: Arc<dyn RangeFetcher>,
    sink: Box<dyn PcmSink>,
    commands: Receiver<DecoderCommand>,
    events: Option<PipelineEventSender>,
    active: Option<ActiveStream>,
    position_ms: Arc<AtomicU64>,
}

impl DecoderThread {
    fn run(mut self) {
        debug!("Decoder thread started");
        loop {
            let playing = self.active.as_ref().is_some_and(|a| a.playing);

            let command = if playing {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                }
            };

            match command {
                Some(DecoderCommand::Shutdown) => break,
                Some(command) => self.handle(command),
                None => self.decode_step(),
            }
        }
        self.sink.reset();
        debug!("Decoder thread stopped");
    }

    fn handle(&mut self, command: DecoderCommand) {
        match command {
            DecoderCommand::Attach(events) => self.events = Some(events),
            DecoderCommand::Load(request) => self.load(request),
            DecoderCommand::Play => {
                if let Some(active) = &mut self.active {
                    active.playing = true;
                }
            }
            DecoderCommand::Pause => {
                if let Some(active) = &mut self.active {
                    active.playing = false;
                }
            }
            DecoderCommand::Seek(position) => self.seek(position),
            DecoderCommand::Stop => {
                self.active = None;
                self.sink.reset();
            }
            DecoderCommand::Shutdown => {}
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn load(&mut self, request: LoadRequest) {
        self.active = None;
        self.sink.reset();

        let LoadRequest {
            load_id,
            track_id,
            stream,
            gain,
        } = request;
        info!(track_id = %track_id, load_id, gain, "Opening stream");
        self.emit(PipelineEvent::Buffering { load_id });

        let opened = self
            .cache
            .open(&track_id)
            .map_err(crate::AudioError::from)
            .and_then(|handle| {
                CachedStream::new(
                    handle,
                    Arc::clone(&self.fetcher),
                    stream.url.clone(),
                    stream.content_length,
                )
            })
            .and_then(|source| StreamDecoder::open(Box::new(source), stream.mime_type.as_deref()));

        match opened {
            Ok(decoder) => {
                let duration = decoder.duration();
                self.active = Some(ActiveStream {
                    load_id,
                    decoder,
                    gain,
                    playing: false,
                });
                self.emit(PipelineEvent::Ready { load_id, duration });
            }
            Err(e) => {
                warn!(track_id = %track_id, load_id, error = %e, "Failed to open stream");
                self.emit(PipelineEvent::Failed {
                    load_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn seek(&mut self, position: Duration) {
        let Some(active) = &mut self.active else {
            return;
        };
        self.sink.reset();
        match active.decoder.seek(position) {
            Ok(actual) => {
                self.position_ms
                    .store(actual.as_millis() as u64, Ordering::Relaxed);
            }
            Err(e) => warn!(load_id = active.load_id, error = %e, "Seek failed"),
        }
    }

    fn decode_step(&mut self) {
        let Some(active) = &mut self.active else {
            return;
        };
        let load_id = active.load_id;

        match active.decoder.next_chunk() {
            Ok(Some(mut chunk)) => {
                if (active.gain - 1.0).abs() > f32::EPSILON {
                    for sample in &mut chunk.samples {
                        *sample *= active.gain;
                    }
                }
                let position = active.decoder.position();
                if let Err(e) = self.sink.write(&chunk) {
                    self.fail(load_id, e.to_string());
                    return;
                }
                self.position_ms
                    .store(position.as_millis() as u64, Ordering::Relaxed);
            }
            Ok(None) => {
                debug!(load_id, "End of stream");
                self.active = None;
                self.emit(PipelineEvent::Ended { load_id });
            }
            Err(e) => self.fail(load_id, e.to_string()),
        }
    }

    fn fail(&mut self, load_id: u64, reason: String) {
        warn!(load_id, reason = %reason, "Decoding failed");
        self.active = None;
        self.sink.reset();
        self.emit(PipelineEvent::Failed { load_id, reason });
    }
}

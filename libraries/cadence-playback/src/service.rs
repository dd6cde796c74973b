//! Playback service: one actor task owning queue, engine and radio
//!
//! Every mutation of the queue or the engine happens on the actor task, in
//! the order the commands were sent. Network work (stream resolution, radio
//! pages) runs on spawned tasks and rejoins the actor through channels,
//! tagged so that results for a superseded load or radio session are
//! dropped. Library writes go to the recorder task.

use crate::engine::{loudness_gain, EngineOutcome, PlaybackEngine};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::pipeline::{AudioPipeline, PipelineEvent};
use crate::queue::{PlayQueue, RemoveEffect};
use crate::radio::{RadioController, RadioFetched, RadioStart};
use crate::recorder::{LibraryRecorder, LibraryWrite};
use crate::types::{PlaybackConfig, PlaybackState, QueueItem, QueueOrigin};
use cadence_cache::{AudioCache, RemoveOutcome};
use cadence_core::{CadenceError, CatalogService, LibraryStore, RadioEndpoint, StreamInfo, TrackId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub items: Vec<QueueItem>,
    pub current_index: Option<usize>,
    pub state: PlaybackState,
    pub radio_active: bool,
}

impl SessionSnapshot {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            current_index: None,
            state: PlaybackState::Idle,
            radio_active: false,
        }
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.current_index.and_then(|i| self.items.get(i))
    }
}

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    ForcePlay { item: QueueItem, reply: oneshot::Sender<()> },
    ForcePlayAtIndex { items: Vec<QueueItem>, index: usize, reply: Reply<()> },
    AddNext { item: QueueItem, reply: oneshot::Sender<()> },
    Enqueue { items: Vec<QueueItem>, reply: oneshot::Sender<()> },
    Remove { index: usize, reply: Reply<QueueItem> },
    Play { reply: Reply<()> },
    Pause { reply: Reply<()> },
    SeekTo { position: Duration, reply: Reply<()> },
    SkipNext { reply: Reply<()> },
    SkipPrevious { reply: Reply<()> },
    SeekToIndex { index: usize, reply: Reply<()> },
    Position { reply: oneshot::Sender<Duration> },
    SetupRadio { endpoint: RadioEndpoint, reply: Reply<usize> },
    StopRadio { reply: oneshot::Sender<()> },
    StartRadio { item: QueueItem, reply: Reply<usize> },
    Shutdown { reply: oneshot::Sender<()> },
}

struct StreamResolved {
    load_id: u64,
    track_id: TrackId,
    result: cadence_core::Result<StreamInfo>,
}

/// Listening time of the current item
#[derive(Default)]
struct ListenClock {
    track_id: Option<TrackId>,
    started: Option<Instant>,
    accumulated: Duration,
}

impl ListenClock {
    fn reset(&mut self, track_id: TrackId) {
        *self = Self {
            track_id: Some(track_id),
            ..Self::default()
        };
    }

    fn start(&mut self) {
        if self.track_id.is_some() && self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    fn take(&mut self) -> Option<(TrackId, Duration)> {
        self.pause();
        let played = std::mem::take(&mut self.accumulated);
        self.track_id.take().filter(|_| !played.is_zero()).map(|id| (id, played))
    }
}

/// Spawns playback sessions
pub struct PlayerService;

impl PlayerService {
    /// Start a session on the current tokio runtime
    pub fn spawn(
        pipeline: Box<dyn AudioPipeline>,
        catalog: Arc<dyn CatalogService>,
        cache: Arc<AudioCache>,
        store: Option<Arc<dyn LibraryStore>>,
        config: PlaybackConfig,
    ) -> PlayerServiceBinder {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (pipeline_tx, pipeline_rx) = mpsc::unbounded_channel();
        let (radio_tx, radio_rx) = mpsc::unbounded_channel();
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::empty());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let actor = SessionActor {
            queue: PlayQueue::new(),
            engine: PlaybackEngine::new(pipeline, pipeline_tx),
            radio: RadioController::new(Arc::clone(&catalog), radio_tx),
            catalog,
            cache: Arc::clone(&cache),
            library: LibraryRecorder::spawn(store.clone()),
            config,
            retries: 0,
            awaiting_radio: false,
            listen: ListenClock::default(),
            published_state: PlaybackState::Idle,
            snapshot: snapshot_tx,
            events: events_tx.clone(),
            resolved_tx,
        };

        let task = tokio::spawn(actor.run(commands_rx, pipeline_rx, radio_rx, resolved_rx));
        info!("Playback session started");

        PlayerServiceBinder {
            player: Player {
                commands: commands_tx,
            },
            cache,
            store,
            snapshot: snapshot_rx,
            events: events_tx,
            task,
        }
    }
}

/// Handle to a running playback session
pub struct PlayerServiceBinder {
    player: Player,
    cache: Arc<AudioCache>,
    store: Option<Arc<dyn LibraryStore>>,
    snapshot: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
    task: JoinHandle<()>,
}

impl PlayerServiceBinder {
    /// Queue and transport intents
    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        &self.cache
    }

    /// Start a radio session, replacing any active one
    pub fn setup_radio(&self, endpoint: RadioEndpoint) -> RadioStart {
        let (reply, receiver) = oneshot::channel();
        self.player.send(Command::SetupRadio { endpoint, reply });
        RadioStart::new(receiver)
    }

    /// Cancel the radio session; items already appended stay queued
    pub async fn stop_radio(&self) -> Result<()> {
        self.player
            .request(|reply| Command::StopRadio { reply })
            .await
    }

    /// Play `item` now and start a radio seeded by it
    pub fn start_radio(&self, item: QueueItem) -> RadioStart {
        let (reply, receiver) = oneshot::channel();
        self.player.send(Command::StartRadio { item, reply });
        RadioStart::new(receiver)
    }

    /// Remove a track's cached audio and its library record
    ///
    /// Cache removal is deferred while the track is being streamed.
    pub async fn delete_track(&self, id: &TrackId) -> Result<RemoveOutcome> {
        let outcome = self.cache.remove_resource(id).map_err(CadenceError::from)?;

        if let Some(store) = &self.store {
            match store.delete_track(id).await {
                Ok(()) | Err(CadenceError::TrackNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(track_id = %id, ?outcome, "Deleted track");
        Ok(outcome)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Stop the session: cancels radio, reports play time, releases the
    /// pipeline
    ///
    /// Returns once queued library writes have been applied.
    pub async fn shutdown(self) {
        if self
            .player
            .request(|reply| Command::Shutdown { reply })
            .await
            .is_err()
        {
            debug!("Session already closed");
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Session task ended abnormally");
        }
    }
}

/// Queue and transport intents
///
/// Each call resolves once the session has applied it; none waits on the
/// network.
#[derive(Clone)]
pub struct Player {
    commands: mpsc::UnboundedSender<Command>,
}

impl Player {
    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Command sent to closed session");
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, receiver) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| PlaybackError::SessionClosed)?;
        receiver.await.map_err(|_| PlaybackError::SessionClosed)
    }

    /// Replace the queue with `item` and play it
    pub async fn force_play(&self, item: QueueItem) -> Result<()> {
        self.request(|reply| Command::ForcePlay { item, reply })
            .await
    }

    /// Replace the queue with `items` and play the one at `index`
    pub async fn force_play_at_index(&self, items: Vec<QueueItem>, index: usize) -> Result<()> {
        self.request(|reply| Command::ForcePlayAtIndex {
            items,
            index,
            reply,
        })
        .await?
    }

    /// Insert after the current item
    pub async fn add_next(&self, item: QueueItem) -> Result<()> {
        self.request(|reply| Command::AddNext { item, reply })
            .await
    }

    pub async fn enqueue(&self, item: QueueItem) -> Result<()> {
        self.enqueue_all(vec![item]).await
    }

    pub async fn enqueue_all(&self, items: Vec<QueueItem>) -> Result<()> {
        self.request(|reply| Command::Enqueue { items, reply })
            .await
    }

    /// Remove the item at `index`, returning it
    pub async fn remove_media_item(&self, index: usize) -> Result<QueueItem> {
        self.request(|reply| Command::Remove { index, reply })
            .await?
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|reply| Command::Play { reply }).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.request(|reply| Command::SeekTo { position, reply })
            .await?
    }

    pub async fn skip_next(&self) -> Result<()> {
        self.request(|reply| Command::SkipNext { reply }).await?
    }

    pub async fn skip_previous(&self) -> Result<()> {
        self.request(|reply| Command::SkipPrevious { reply })
            .await?
    }

    /// Jump to `index` and play it
    pub async fn seek_to_index(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::SeekToIndex { index, reply })
            .await?
    }

    /// Position within the current item
    pub async fn position(&self) -> Result<Duration> {
        self.request(|reply| Command::Position { reply }).await
    }
}

struct SessionActor {
    queue: PlayQueue,
    engine: PlaybackEngine,
    radio: RadioController,
    catalog: Arc<dyn CatalogService>,
    cache: Arc<AudioCache>,
    library: LibraryRecorder,
    config: PlaybackConfig,
    retries: u32,
    /// Queue ran out while a radio page was in flight
    awaiting_radio: bool,
    listen: ListenClock,
    published_state: PlaybackState,
    snapshot: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
    resolved_tx: mpsc::UnboundedSender<StreamResolved>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut pipeline_events: mpsc::UnboundedReceiver<PipelineEvent>,
        mut radio_results: mpsc::UnboundedReceiver<RadioFetched>,
        mut resolved: mpsc::UnboundedReceiver<StreamResolved>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                Some(event) = pipeline_events.recv() => self.on_pipeline_event(event),
                Some(fetched) = radio_results.recv() => self.on_radio_fetched(fetched),
                Some(stream) = resolved.recv() => self.on_stream_resolved(stream),
            }
            self.publish();
        }
        self.library.close().await;
        info!("Playback session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::ForcePlay { item, reply } => {
                // A single-item queue always has a valid index 0
                let _ = self.replace_queue(vec![item], 0);
                let _ = reply.send(());
            }
            Command::ForcePlayAtIndex {
                items,
                index,
                reply,
            } => {
                let _ = reply.send(self.replace_queue(items, index));
            }
            Command::AddNext { item, reply } => {
                let at = self.queue.add_next(item);
                debug!(index = at, "Added next");
                self.queue_changed();
                let _ = reply.send(());
            }
            Command::Enqueue { items, reply } => {
                debug!(count = items.len(), "Enqueued");
                self.queue.enqueue(items);
                self.queue_changed();
                let _ = reply.send(());
            }
            Command::Remove { index, reply } => {
                let _ = reply.send(self.remove(index));
            }
            Command::Play { reply } => {
                let _ = reply.send(self.play());
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.engine.pause());
            }
            Command::SeekTo { position, reply } => {
                let _ = reply.send(self.engine.seek(position));
            }
            Command::SkipNext { reply } => {
                let _ = reply.send(self.skip_next());
            }
            Command::SkipPrevious { reply } => {
                let _ = reply.send(self.skip_previous());
            }
            Command::SeekToIndex { index, reply } => {
                let result = self.queue.set_current(index).map(|()| {
                    self.retries = 0;
                    self.load_current(true);
                });
                let _ = reply.send(result);
            }
            Command::Position { reply } => {
                let _ = reply.send(self.engine.position());
            }
            Command::SetupRadio { endpoint, reply } => {
                let current = self.queue.current().map(|item| item.id().clone());
                self.radio.start(endpoint, current, reply);
            }
            Command::StopRadio { reply } => {
                self.stop_radio();
                let _ = reply.send(());
            }
            Command::StartRadio { item, reply } => {
                let seed = item.id().clone();
                let _ = self.replace_queue(vec![item], 0);
                self.radio
                    .start(RadioEndpoint::watch(seed.clone(), None), Some(seed), reply);
            }
            Command::Shutdown { reply } => {
                self.shutdown();
                let _ = reply.send(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Queue intents
    // ------------------------------------------------------------------

    /// Replace the queue and play `index`; stops any radio session
    fn replace_queue(&mut self, items: Vec<QueueItem>, index: usize) -> Result<()> {
        if index >= items.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index,
                len: items.len(),
            });
        }

        // The new queue supersedes a wait for radio; nothing has ended
        self.radio.stop();
        self.awaiting_radio = false;
        self.queue.replace(items, index)?;
        self.queue_changed();
        self.retries = 0;
        self.load_current(true);
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<QueueItem> {
        let play_when_ready = self.engine.play_when_ready();
        let (removed, effect) = self.queue.remove(index)?;
        debug!(index, track_id = %removed.id(), ?effect, "Removed queue item");
        self.queue_changed();

        match effect {
            RemoveEffect::Current { next: Some(_) } => {
                self.retries = 0;
                self.load_current(play_when_ready);
            }
            RemoveEffect::Current { next: None } => {
                self.flush_listen();
                if self.queue.is_empty() {
                    self.engine.stop();
                } else {
                    self.end_queue();
                }
            }
            RemoveEffect::BeforeCurrent | RemoveEffect::AfterCurrent | RemoveEffect::NoCurrent => {
                self.maybe_extend_radio();
            }
        }

        Ok(removed)
    }

    fn play(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Err(PlaybackError::QueueEmpty);
        }

        match self.engine.state() {
            PlaybackState::Idle | PlaybackState::Error => {
                if self.queue.current_index().is_none() {
                    self.queue.advance();
                }
                self.retries = 0;
                self.load_current(true);
                Ok(())
            }
            PlaybackState::Ended => {
                if self.queue.current_index().is_none() || self.queue.remaining() > 0 {
                    self.queue.advance();
                }
                self.retries = 0;
                self.load_current(true);
                Ok(())
            }
            _ => self.engine.play(),
        }
    }

    fn skip_next(&mut self) -> Result<()> {
        let play_when_ready = self.engine.play_when_ready();
        match self.queue.advance() {
            Some(_) => {
                self.retries = 0;
                self.load_current(play_when_ready);
                Ok(())
            }
            None => Err(PlaybackError::IndexOutOfBounds {
                index: self.queue.current_index().map_or(0, |i| i + 1),
                len: self.queue.len(),
            }),
        }
    }

    fn skip_previous(&mut self) -> Result<()> {
        let threshold = Duration::from_millis(self.config.restart_threshold_ms);
        let loaded = self.engine.active_load().is_some();

        if loaded && self.engine.position() > threshold {
            return self.engine.seek(Duration::ZERO);
        }

        let play_when_ready = self.engine.play_when_ready();
        if self.queue.retreat().is_some() {
            self.retries = 0;
            self.load_current(play_when_ready);
            Ok(())
        } else if loaded {
            self.engine.seek(Duration::ZERO)
        } else {
            Ok(())
        }
    }

    fn queue_changed(&mut self) {
        self.emit(PlaybackEvent::QueueChanged {
            len: self.queue.len(),
        });
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load the current item; resolves its stream in the background
    fn load_current(&mut self, play_when_ready: bool) {
        let Some((index, item)) = self
            .queue
            .current_index()
            .and_then(|i| self.queue.get(i).map(|item| (i, item.clone())))
        else {
            return;
        };
        let track_id = item.id().clone();

        self.flush_listen();
        self.awaiting_radio = false;
        let load_id = self.engine.begin_load(track_id.clone(), play_when_ready);
        self.listen.reset(track_id.clone());
        self.emit(PlaybackEvent::TrackChanged {
            index,
            track_id: track_id.clone(),
        });

        self.library.record(LibraryWrite::Track(Box::new(item.track)));

        let catalog = Arc::clone(&self.catalog);
        let resolved = self.resolved_tx.clone();
        tokio::spawn(async move {
            let result = catalog.stream_info(&track_id).await;
            let _ = resolved.send(StreamResolved {
                load_id,
                track_id,
                result,
            });
        });

        self.maybe_extend_radio();
    }

    fn on_stream_resolved(&mut self, resolved: StreamResolved) {
        let StreamResolved {
            load_id,
            track_id,
            result,
        } = resolved;

        if self.engine.active_load() != Some(load_id) {
            debug!(track_id = %track_id, load_id, "Discarding stale stream resolution");
            return;
        }

        match result {
            Ok(stream) => {
                self.record_stream_details(&track_id, &stream);
                let gain = if self.config.normalize_loudness {
                    loudness_gain(stream.loudness_db)
                } else {
                    1.0
                };
                if let Err(e) = self.engine.start_stream(load_id, stream, gain) {
                    self.engine.fail(load_id);
                    self.on_track_failed(track_id, e.to_string());
                }
            }
            Err(e) => {
                if self.engine.fail(load_id) {
                    self.on_track_failed(track_id, e.to_string());
                }
            }
        }
    }

    fn record_stream_details(&self, track_id: &TrackId, stream: &StreamInfo) {
        if let Some(len) = stream.content_length {
            if let Err(e) = self.cache.set_content_length(track_id, len) {
                warn!(track_id = %track_id, error = %e, "Cache rejected content length");
            }
        }

        self.library.record(LibraryWrite::StreamDetails {
            track_id: track_id.clone(),
            loudness_db: stream.loudness_db,
            content_length: stream.content_length,
        });
    }

    fn on_pipeline_event(&mut self, event: PipelineEvent) {
        match self.engine.handle_event(event) {
            EngineOutcome::Ignored | EngineOutcome::StateChanged(_) => {}
            EngineOutcome::TrackEnded(track_id) => {
                debug!(track_id = %track_id, "Track finished");
                self.emit(PlaybackEvent::TrackFinished { track_id });
                self.advance_or_end(true);
            }
            EngineOutcome::TrackFailed { track_id, reason } => {
                self.on_track_failed(track_id, reason);
            }
        }
    }

    /// Retry the current item, or skip it once retries are used up
    fn on_track_failed(&mut self, track_id: TrackId, reason: String) {
        let will_retry = self.retries < self.config.max_retries;
        warn!(track_id = %track_id, reason = %reason, will_retry, attempt = self.retries + 1, "Track failed");
        self.emit(PlaybackEvent::TrackFailed {
            track_id,
            reason,
            will_retry,
        });

        let play_when_ready = self.engine.play_when_ready();
        if will_retry {
            self.retries += 1;
            self.load_current(play_when_ready);
        } else {
            self.advance_or_end(play_when_ready);
        }
    }

    fn advance_or_end(&mut self, play_when_ready: bool) {
        if self.queue.advance().is_some() {
            self.retries = 0;
            self.load_current(play_when_ready);
            return;
        }

        self.maybe_extend_radio();
        if self.radio.is_fetching() {
            debug!("Queue exhausted, waiting for radio");
            self.flush_listen();
            self.engine.begin_wait(play_when_ready);
            self.awaiting_radio = true;
        } else {
            self.end_queue();
        }
    }

    fn end_queue(&mut self) {
        self.flush_listen();
        self.awaiting_radio = false;
        self.engine.end();
        info!("Queue ended");
        self.emit(PlaybackEvent::QueueEnded);
    }

    // ------------------------------------------------------------------
    // Radio
    // ------------------------------------------------------------------

    fn maybe_extend_radio(&mut self) {
        self.radio
            .extend_if_needed(self.queue.remaining(), self.config.radio_low_watermark);
    }

    /// Explicit stop: a queue waiting on radio ends here
    fn stop_radio(&mut self) {
        self.radio.stop();
        if self.awaiting_radio {
            self.end_queue();
        }
    }

    fn on_radio_fetched(&mut self, fetched: RadioFetched) {
        let generation = fetched.generation;
        let first_page = self.radio.awaiting_first_page();

        let Some(result) = self.radio.accept(fetched) else {
            debug!(generation, "Discarding stale radio page");
            return;
        };

        match result {
            Ok(songs) => {
                let count = songs.len();
                self.queue.enqueue(songs.into_iter().map(|song| {
                    QueueItem::from(song).with_origin(QueueOrigin::Radio { session: generation })
                }));
                info!(generation, count, "Radio extended queue");
                if count > 0 {
                    self.queue_changed();
                }
                self.emit(PlaybackEvent::RadioExtended { count });
                if first_page {
                    self.radio.settle_first_page(Ok(count));
                }

                if self.awaiting_radio {
                    self.awaiting_radio = false;
                    let play_when_ready = self.engine.play_when_ready();
                    if self.queue.advance().is_some() {
                        self.retries = 0;
                        self.load_current(play_when_ready);
                    } else {
                        self.end_queue();
                    }
                } else if count > 0 {
                    self.maybe_extend_radio();
                }
            }
            Err(err) => {
                warn!(generation, error = %err, "Radio fetch failed");
                self.emit(PlaybackEvent::RadioFailed {
                    reason: err.to_string(),
                });
                if first_page {
                    self.radio.settle_first_page(Err(err));
                }
                if self.awaiting_radio {
                    self.end_queue();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    /// Report listened time of the item being left
    fn flush_listen(&mut self) {
        let Some((track_id, played)) = self.listen.take() else {
            return;
        };
        let played_ms = played.as_millis() as u64;
        debug!(track_id = %track_id, played_ms, "Recording play time");
        self.library
            .record(LibraryWrite::PlayTime { track_id, played_ms });
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn publish(&mut self) {
        let state = self.engine.state();
        if state != self.published_state {
            if state == PlaybackState::Playing {
                self.listen.start();
            } else {
                self.listen.pause();
            }
            self.published_state = state;
            self.emit(PlaybackEvent::StateChanged { state });
        }

        let snapshot = SessionSnapshot {
            items: self.queue.items().to_vec(),
            current_index: self.queue.current_index(),
            state,
            radio_active: self.radio.is_active(),
        };
        self.snapshot.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn shutdown(&mut self) {
        self.radio.stop();
        self.flush_listen();
        self.engine.release();
        self.publish();
    }
}

//! Integration tests for the playback session
//!
//! The session runs against a scripted pipeline and catalog. Tests drive it
//! through the public binder and observe the snapshot watch channel, the
//! event stream, and the loads the pipeline receives.

use async_trait::async_trait;
use cadence_cache::{AudioCache, CacheConfig, RemoveOutcome};
use cadence_core::{
    CadenceError, CatalogService, CatalogSong, LibraryStore, RadioEndpoint, RadioPage,
    SearchFilter, SearchPage, StreamInfo, Track, TrackId,
};
use cadence_playback::{
    AudioPipeline, LoadRequest, PipelineEvent, PipelineEventSender, PlaybackConfig, PlaybackError,
    PlaybackEvent, PlaybackState, PlayerService, PlayerServiceBinder, QueueItem, QueueOrigin,
    SessionSnapshot,
};
use cadence_storage::SqliteLibrary;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;

const TIMEOUT: Duration = Duration::from_secs(2);

// ===== Test Helpers =====

#[derive(Default)]
struct PipelineShared {
    events: Mutex<Option<PipelineEventSender>>,
    calls: Mutex<Vec<String>>,
    position: Mutex<Duration>,
}

/// Pipeline that forwards loads to the test and lets it inject events
struct ScriptedPipeline {
    shared: Arc<PipelineShared>,
    loads: mpsc::UnboundedSender<LoadRequest>,
}

impl AudioPipeline for ScriptedPipeline {
    fn attach(&mut self, events: PipelineEventSender) {
        *self.shared.events.lock().unwrap() = Some(events);
    }

    fn load(&mut self, request: LoadRequest) -> cadence_playback::Result<()> {
        self.shared
            .calls
            .lock()
            .unwrap()
            .push(format!("load {}", request.track_id));
        self.loads.send(request).unwrap();
        Ok(())
    }

    fn play(&mut self) {
        self.shared.calls.lock().unwrap().push("play".into());
    }

    fn pause(&mut self) {
        self.shared.calls.lock().unwrap().push("pause".into());
    }

    fn seek(&mut self, position: Duration) {
        self.shared
            .calls
            .lock()
            .unwrap()
            .push(format!("seek {}", position.as_millis()));
    }

    fn stop(&mut self) {
        self.shared.calls.lock().unwrap().push("stop".into());
    }

    fn position(&self) -> Duration {
        *self.shared.position.lock().unwrap()
    }

    fn release(&mut self) {
        self.shared.calls.lock().unwrap().push("release".into());
    }
}

/// Catalog with scripted streams and radio pages
///
/// Radio pages are keyed by `seed@continuation` so results do not depend on
/// the order in which fetch tasks run.
#[derive(Default)]
struct ScriptedCatalog {
    failing_streams: Mutex<HashSet<TrackId>>,
    loudness: Mutex<HashMap<TrackId, f32>>,
    radio_pages: Mutex<HashMap<String, RadioPage>>,
    radio_holds: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

fn radio_key(endpoint: &RadioEndpoint, continuation: Option<&str>) -> String {
    let seed = endpoint
        .video_id
        .as_ref()
        .map(|id| id.as_str().to_string())
        .or_else(|| endpoint.playlist_id.clone())
        .unwrap_or_default();
    format!("{}@{}", seed, continuation.unwrap_or("start"))
}

impl ScriptedCatalog {
    fn fail_stream(&self, id: &str) {
        self.failing_streams.lock().unwrap().insert(TrackId::new(id));
    }

    fn set_loudness(&self, id: &str, db: f32) {
        self.loudness.lock().unwrap().insert(TrackId::new(id), db);
    }

    fn radio_page(&self, key: &str, ids: &[&str], continuation: Option<&str>) {
        self.radio_pages.lock().unwrap().insert(
            key.to_string(),
            RadioPage {
                items: ids.iter().map(|id| song(id)).collect(),
                continuation: continuation.map(str::to_string),
            },
        );
    }

    /// Block the fetch for `key` until the returned sender fires
    fn hold_radio(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.radio_holds.lock().unwrap().insert(key.to_string(), rx);
        tx
    }
}

#[async_trait]
impl CatalogService for ScriptedCatalog {
    async fn search(
        &self,
        _query: &str,
        _filter: SearchFilter,
        _continuation: Option<&str>,
    ) -> cadence_core::Result<SearchPage> {
        Ok(SearchPage::default())
    }

    async fn song(&self, id: &TrackId) -> cadence_core::Result<Option<CatalogSong>> {
        Ok(Some(CatalogSong::new(id.clone(), id.as_str())))
    }

    async fn queue(&self, _playlist_id: &str) -> cadence_core::Result<Option<Vec<CatalogSong>>> {
        Ok(None)
    }

    async fn next(
        &self,
        endpoint: &RadioEndpoint,
        continuation: Option<&str>,
    ) -> cadence_core::Result<RadioPage> {
        let key = radio_key(endpoint, continuation);
        let hold = self.radio_holds.lock().unwrap().remove(&key);
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        self.radio_pages
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| CadenceError::network(format!("no radio page for {key}")))
    }

    async fn stream_info(&self, id: &TrackId) -> cadence_core::Result<StreamInfo> {
        if self.failing_streams.lock().unwrap().contains(id) {
            return Err(CadenceError::network("stream unavailable"));
        }
        Ok(StreamInfo {
            url: format!("https://cdn.test/{id}"),
            content_length: Some(4096),
            loudness_db: self.loudness.lock().unwrap().get(id).copied(),
            mime_type: Some("audio/webm".into()),
        })
    }
}

struct Harness {
    binder: PlayerServiceBinder,
    catalog: Arc<ScriptedCatalog>,
    pipeline: Arc<PipelineShared>,
    loads: mpsc::UnboundedReceiver<LoadRequest>,
    store: Option<Arc<SqliteLibrary>>,
    _temp_dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self::build(PlaybackConfig::default(), false).await
    }

    async fn with_store() -> Self {
        Self::build(PlaybackConfig::default(), true).await
    }

    async fn build(config: PlaybackConfig, with_store: bool) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = Arc::new(
            AudioCache::new(CacheConfig::new(temp_dir.path().join("cache")))
                .expect("Failed to create cache"),
        );

        let store = if with_store {
            let db_url = format!("sqlite://{}", temp_dir.path().join("library.db").display());
            let pool = cadence_storage::create_pool(&db_url)
                .await
                .expect("Failed to create pool");
            cadence_storage::run_migrations(&pool)
                .await
                .expect("Failed to run migrations");
            Some(Arc::new(SqliteLibrary::new(pool)))
        } else {
            None
        };

        let catalog = Arc::new(ScriptedCatalog::default());
        let pipeline = Arc::new(PipelineShared::default());
        let (loads_tx, loads) = mpsc::unbounded_channel();

        let binder = PlayerService::spawn(
            Box::new(ScriptedPipeline {
                shared: Arc::clone(&pipeline),
                loads: loads_tx,
            }),
            Arc::clone(&catalog) as Arc<dyn CatalogService>,
            cache,
            store.clone().map(|s| s as Arc<dyn LibraryStore>),
            config,
        );

        Self {
            binder,
            catalog,
            pipeline,
            loads,
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Next stream handed to the pipeline
    async fn next_load(&mut self) -> LoadRequest {
        timeout(TIMEOUT, self.loads.recv())
            .await
            .expect("timed out waiting for a load")
            .expect("pipeline dropped")
    }

    fn emit(&self, event: PipelineEvent) {
        self.pipeline
            .events
            .lock()
            .unwrap()
            .as_ref()
            .expect("pipeline not attached")
            .send(event)
            .unwrap();
    }

    fn ready(&self, load: &LoadRequest) {
        self.emit(PipelineEvent::Ready {
            load_id: load.load_id,
            duration: Some(Duration::from_secs(180)),
        });
    }

    /// Load the next stream and bring it to `Playing`
    async fn play_next_load(&mut self) -> LoadRequest {
        let load = self.next_load().await;
        self.ready(&load);
        self.wait_for(|s| s.state == PlaybackState::Playing).await;
        load
    }

    async fn wait_for(&self, predicate: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let mut rx = self.binder.watch();
        let snapshot = timeout(TIMEOUT, rx.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("session closed");
        snapshot.clone()
    }

    fn calls(&self) -> Vec<String> {
        self.pipeline.calls.lock().unwrap().clone()
    }
}

fn song(id: &str) -> CatalogSong {
    CatalogSong::new(TrackId::new(id), format!("Song {id}"))
}

fn item(id: &str) -> QueueItem {
    QueueItem::new(Track::new(TrackId::new(id), format!("Song {id}")))
}

fn items(ids: &[&str]) -> Vec<QueueItem> {
    ids.iter().map(|id| item(id)).collect()
}

fn ids(snapshot: &SessionSnapshot) -> Vec<String> {
    snapshot
        .items
        .iter()
        .map(|i| i.id().as_str().to_string())
        .collect()
}

async fn wait_event(
    events: &mut broadcast::Receiver<PlaybackEvent>,
    mut predicate: impl FnMut(&PlaybackEvent) -> bool,
) -> PlaybackEvent {
    loop {
        let event = timeout(TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        if predicate(&event) {
            return event;
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

mod transport {
    use super::*;

    #[tokio::test]
    async fn force_play_loads_and_plays_when_ready() {
        let mut h = Harness::new().await;

        h.binder.player().force_play(item("a")).await.unwrap();
        let load = h.next_load().await;
        assert_eq!(load.track_id, TrackId::new("a"));
        assert_eq!(load.stream.url, "https://cdn.test/a");
        assert_eq!(h.binder.snapshot().state, PlaybackState::Buffering);

        h.ready(&load);
        let snapshot = h.wait_for(|s| s.state == PlaybackState::Playing).await;

        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.current().unwrap().id(), &TrackId::new("a"));
        assert!(h.calls().contains(&"play".to_string()));
    }

    #[tokio::test]
    async fn loud_streams_are_attenuated() {
        let mut h = Harness::new().await;
        h.catalog.set_loudness("loud", 6.0);

        h.binder.player().force_play(item("loud")).await.unwrap();
        let load = h.next_load().await;

        assert!((load.gain - 0.501).abs() < 0.01, "gain was {}", load.gain);
    }

    #[tokio::test]
    async fn pause_and_resume() {
        let mut h = Harness::new().await;
        h.binder.player().force_play(item("a")).await.unwrap();
        h.play_next_load().await;

        h.binder.player().pause().await.unwrap();
        assert_eq!(h.binder.snapshot().state, PlaybackState::Paused);

        let err = h.binder.player().pause().await.unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidOperation(_)));

        h.binder.player().play().await.unwrap();
        assert_eq!(h.binder.snapshot().state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn play_on_empty_queue_is_rejected() {
        let h = Harness::new().await;

        let err = h.binder.player().play().await.unwrap_err();

        assert!(matches!(err, PlaybackError::QueueEmpty));
        assert_eq!(h.binder.snapshot().state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn play_from_idle_starts_first_item() {
        let mut h = Harness::new().await;
        h.binder.player().enqueue_all(items(&["a", "b"])).await.unwrap();
        assert_eq!(h.binder.snapshot().current_index, None);

        h.binder.player().play().await.unwrap();
        let load = h.next_load().await;

        assert_eq!(load.track_id, TrackId::new("a"));
        assert_eq!(h.binder.snapshot().current_index, Some(0));
    }

    #[tokio::test]
    async fn track_end_advances_and_keeps_playing() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b", "c"]), 0)
            .await
            .unwrap();
        let first = h.play_next_load().await;

        h.emit(PipelineEvent::Ended {
            load_id: first.load_id,
        });
        let second = h.next_load().await;
        assert_eq!(second.track_id, TrackId::new("b"));
        assert_eq!(h.binder.snapshot().current_index, Some(1));

        h.ready(&second);
        h.wait_for(|s| s.state == PlaybackState::Playing).await;
    }

    #[tokio::test]
    async fn last_track_end_enters_ended() {
        let mut h = Harness::new().await;
        let mut events = h.binder.subscribe();
        h.binder.player().force_play(item("a")).await.unwrap();
        let load = h.play_next_load().await;

        h.emit(PipelineEvent::Ended {
            load_id: load.load_id,
        });

        wait_event(&mut events, |e| *e == PlaybackEvent::QueueEnded).await;
        let snapshot = h.wait_for(|s| s.state == PlaybackState::Ended).await;
        assert_eq!(snapshot.current_index, Some(0));
    }

    #[tokio::test]
    async fn play_after_ended_restarts_last_item() {
        let mut h = Harness::new().await;
        h.binder.player().force_play(item("a")).await.unwrap();
        let load = h.play_next_load().await;
        h.emit(PipelineEvent::Ended {
            load_id: load.load_id,
        });
        h.wait_for(|s| s.state == PlaybackState::Ended).await;

        h.binder.player().play().await.unwrap();
        let reload = h.next_load().await;

        assert_eq!(reload.track_id, TrackId::new("a"));
        assert!(reload.load_id > load.load_id);
    }

    #[tokio::test]
    async fn stale_pipeline_events_are_ignored() {
        let mut h = Harness::new().await;
        h.binder.player().force_play(item("a")).await.unwrap();
        let old = h.play_next_load().await;

        h.binder.player().force_play(item("b")).await.unwrap();
        let new = h.next_load().await;
        h.emit(PipelineEvent::Ended {
            load_id: old.load_id,
        });
        h.ready(&new);

        let snapshot = h.wait_for(|s| s.state == PlaybackState::Playing).await;
        assert_eq!(ids(&snapshot), vec!["b"]);
        assert_eq!(snapshot.current_index, Some(0));
    }

    #[tokio::test]
    async fn skip_previous_restarts_after_threshold() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b"]), 1)
            .await
            .unwrap();
        h.play_next_load().await;
        *h.pipeline.position.lock().unwrap() = Duration::from_secs(10);

        h.binder.player().skip_previous().await.unwrap();

        assert_eq!(h.binder.snapshot().current_index, Some(1));
        assert_eq!(h.calls().last().unwrap(), "seek 0");
    }

    #[tokio::test]
    async fn skip_previous_goes_back_near_start() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b"]), 1)
            .await
            .unwrap();
        h.play_next_load().await;
        *h.pipeline.position.lock().unwrap() = Duration::from_secs(1);

        h.binder.player().skip_previous().await.unwrap();
        let load = h.next_load().await;

        assert_eq!(load.track_id, TrackId::new("a"));
        assert_eq!(h.binder.snapshot().current_index, Some(0));
    }

    #[tokio::test]
    async fn skip_next_past_end_is_rejected() {
        let mut h = Harness::new().await;
        h.binder.player().force_play(item("a")).await.unwrap();
        h.next_load().await;

        let err = h.binder.player().skip_next().await.unwrap_err();

        assert!(matches!(
            err,
            PlaybackError::IndexOutOfBounds { index: 1, len: 1 }
        ));
    }

    #[tokio::test]
    async fn position_comes_from_pipeline() {
        let mut h = Harness::new().await;
        h.binder.player().force_play(item("a")).await.unwrap();
        h.play_next_load().await;
        *h.pipeline.position.lock().unwrap() = Duration::from_millis(1500);

        let position = h.binder.player().position().await.unwrap();

        assert_eq!(position, Duration::from_millis(1500));
    }
}

// ============================================================================
// Queue
// ============================================================================

mod queue {
    use super::*;

    #[tokio::test]
    async fn force_play_at_index_rejects_bad_index() {
        let h = Harness::new().await;

        let err = h
            .binder
            .player()
            .force_play_at_index(items(&["a", "b"]), 2)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PlaybackError::IndexOutOfBounds { index: 2, len: 2 }
        ));
        assert!(h.binder.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn add_next_and_enqueue_keep_current() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b"]), 0)
            .await
            .unwrap();
        h.play_next_load().await;

        h.binder.player().enqueue(item("z")).await.unwrap();
        h.binder.player().add_next(item("n")).await.unwrap();

        let snapshot = h.binder.snapshot();
        assert_eq!(ids(&snapshot), vec!["a", "n", "b", "z"]);
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn removing_current_loads_successor() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b", "c"]), 1)
            .await
            .unwrap();
        h.play_next_load().await;

        let removed = h.binder.player().remove_media_item(1).await.unwrap();
        let load = h.next_load().await;

        assert_eq!(removed.id(), &TrackId::new("b"));
        assert_eq!(load.track_id, TrackId::new("c"));
        let snapshot = h.binder.snapshot();
        assert_eq!(ids(&snapshot), vec!["a", "c"]);
        assert_eq!(snapshot.current_index, Some(1));
    }

    #[tokio::test]
    async fn removing_before_current_shifts_index() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b", "c"]), 2)
            .await
            .unwrap();
        h.play_next_load().await;

        h.binder.player().remove_media_item(0).await.unwrap();

        let snapshot = h.binder.snapshot();
        assert_eq!(ids(&snapshot), vec!["b", "c"]);
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn removing_last_current_item_ends_playback() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b"]), 1)
            .await
            .unwrap();
        h.play_next_load().await;

        h.binder.player().remove_media_item(1).await.unwrap();

        let snapshot = h.binder.snapshot();
        assert_eq!(ids(&snapshot), vec!["a"]);
        assert_eq!(snapshot.current_index, None);
        assert_eq!(snapshot.state, PlaybackState::Ended);
    }

    #[tokio::test]
    async fn removing_only_item_goes_idle() {
        let mut h = Harness::new().await;
        h.binder.player().force_play(item("a")).await.unwrap();
        h.play_next_load().await;

        h.binder.player().remove_media_item(0).await.unwrap();

        let snapshot = h.binder.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn remove_out_of_range_leaves_queue_untouched() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b"]), 0)
            .await
            .unwrap();
        h.next_load().await;

        let err = h.binder.player().remove_media_item(5).await.unwrap_err();

        assert!(matches!(
            err,
            PlaybackError::IndexOutOfBounds { index: 5, len: 2 }
        ));
        assert_eq!(ids(&h.binder.snapshot()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn seek_to_index_loads_that_item() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b", "c"]), 0)
            .await
            .unwrap();
        h.next_load().await;

        h.binder.player().seek_to_index(2).await.unwrap();
        let load = h.next_load().await;

        assert_eq!(load.track_id, TrackId::new("c"));
        assert_eq!(h.binder.snapshot().current_index, Some(2));
    }
}

// ============================================================================
// Failure handling
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn unresolvable_stream_is_retried_then_skipped() {
        let mut h = Harness::new().await;
        let mut events = h.binder.subscribe();
        h.catalog.fail_stream("bad");

        h.binder
            .player()
            .force_play_at_index(items(&["bad", "good"]), 0)
            .await
            .unwrap();

        let first = wait_event(&mut events, |e| matches!(e, PlaybackEvent::TrackFailed { .. })).await;
        assert!(matches!(first, PlaybackEvent::TrackFailed { will_retry: true, .. }));
        let second = wait_event(&mut events, |e| matches!(e, PlaybackEvent::TrackFailed { .. })).await;
        assert!(matches!(second, PlaybackEvent::TrackFailed { will_retry: false, .. }));

        let load = h.next_load().await;
        assert_eq!(load.track_id, TrackId::new("good"));
        assert_eq!(h.binder.snapshot().current_index, Some(1));
    }

    #[tokio::test]
    async fn decode_failure_reloads_once_before_skipping() {
        let mut h = Harness::new().await;
        h.binder
            .player()
            .force_play_at_index(items(&["a", "b"]), 0)
            .await
            .unwrap();

        let first = h.next_load().await;
        h.emit(PipelineEvent::Failed {
            load_id: first.load_id,
            reason: "corrupt frame".into(),
        });

        let retry = h.next_load().await;
        assert_eq!(retry.track_id, TrackId::new("a"));
        assert!(retry.load_id > first.load_id);

        h.emit(PipelineEvent::Failed {
            load_id: retry.load_id,
            reason: "corrupt frame".into(),
        });

        let skipped_to = h.next_load().await;
        assert_eq!(skipped_to.track_id, TrackId::new("b"));
    }

    #[tokio::test]
    async fn failing_last_item_ends_queue() {
        let h = Harness::new().await;
        h.catalog.fail_stream("bad");

        h.binder.player().force_play(item("bad")).await.unwrap();

        let snapshot = h.wait_for(|s| s.state == PlaybackState::Ended).await;
        assert_eq!(ids(&snapshot), vec!["bad"]);
    }
}

// ============================================================================
// Radio
// ============================================================================

mod radio {
    use super::*;

    #[tokio::test]
    async fn start_radio_appends_first_page_without_seed() {
        let mut h = Harness::new().await;
        h.catalog
            .radio_page("a@start", &["a", "r1", "r2", "r3", "r4"], None);

        let appended = h.binder.start_radio(item("a")).outcome().await.unwrap();
        h.next_load().await;

        assert_eq!(appended, 4);
        let snapshot = h.binder.snapshot();
        assert_eq!(ids(&snapshot), vec!["a", "r1", "r2", "r3", "r4"]);
        assert_eq!(snapshot.current_index, Some(0));
        assert!(snapshot.radio_active);
        assert!(snapshot.items[1..]
            .iter()
            .all(|i| matches!(i.origin, QueueOrigin::Radio { .. })));
    }

    #[tokio::test]
    async fn invalid_endpoint_is_rejected() {
        let h = Harness::new().await;
        let endpoint = RadioEndpoint {
            video_id: None,
            playlist_id: None,
            params: None,
        };

        let err = h.binder.setup_radio(endpoint).outcome().await.unwrap_err();

        assert!(matches!(err, PlaybackError::InvalidEndpoint));
        assert!(!h.binder.snapshot().radio_active);
    }

    #[tokio::test]
    async fn failed_first_page_reports_error() {
        let h = Harness::new().await;

        let err = h
            .binder
            .setup_radio(RadioEndpoint::playlist("PLmissing"))
            .outcome()
            .await
            .unwrap_err();

        assert!(matches!(err, PlaybackError::Core(CadenceError::Network(_))));
        assert!(!h.binder.snapshot().radio_active);
    }

    #[tokio::test]
    async fn replacing_radio_cancels_pending_start() {
        let h = Harness::new().await;
        let _hold = h.catalog.hold_radio("x@start");
        h.catalog.radio_page("y@start", &["y1", "y2"], None);

        let first = h
            .binder
            .setup_radio(RadioEndpoint::watch(TrackId::new("x"), None));
        let second = h
            .binder
            .setup_radio(RadioEndpoint::watch(TrackId::new("y"), None));

        assert!(matches!(
            first.outcome().await,
            Err(PlaybackError::RadioCancelled)
        ));
        assert_eq!(second.outcome().await.unwrap(), 2);
        assert_eq!(ids(&h.binder.snapshot()), vec!["y1", "y2"]);
    }

    #[tokio::test]
    async fn stopped_radio_never_appends() {
        let h = Harness::new().await;
        let release = h.catalog.hold_radio("x@start");
        h.catalog.radio_page("x@start", &["x1"], None);

        let start = h
            .binder
            .setup_radio(RadioEndpoint::watch(TrackId::new("x"), None));
        h.binder.stop_radio().await.unwrap();
        let _ = release.send(());

        assert!(matches!(
            start.outcome().await,
            Err(PlaybackError::RadioCancelled)
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snapshot = h.binder.snapshot();
        assert!(snapshot.items.is_empty());
        assert!(!snapshot.radio_active);
    }

    #[tokio::test]
    async fn radio_extends_queue_when_running_low() {
        let mut h = Harness::new().await;
        h.catalog.radio_page("a@start", &["r1"], Some("c1"));
        h.catalog.radio_page("a@c1", &["r2", "r3"], None);

        h.binder.start_radio(item("a")).outcome().await.unwrap();
        h.next_load().await;

        let snapshot = h.wait_for(|s| s.items.len() == 4).await;
        assert_eq!(ids(&snapshot), vec!["a", "r1", "r2", "r3"]);
        assert_eq!(snapshot.current_index, Some(0));
    }

    #[tokio::test]
    async fn queue_end_waits_for_radio_extension() {
        let mut h = Harness::new().await;
        h.catalog.radio_page("a@start", &[], Some("c1"));
        h.catalog.radio_page("a@c1", &["r1"], None);
        let release = h.catalog.hold_radio("a@c1");

        assert_eq!(h.binder.start_radio(item("a")).outcome().await.unwrap(), 0);
        let load = h.play_next_load().await;

        h.emit(PipelineEvent::Ended {
            load_id: load.load_id,
        });
        h.wait_for(|s| s.state == PlaybackState::Buffering).await;

        release.send(()).unwrap();
        let next = h.next_load().await;

        assert_eq!(next.track_id, TrackId::new("r1"));
        assert_eq!(h.binder.snapshot().current_index, Some(1));
    }

    #[tokio::test]
    async fn force_play_while_waiting_for_radio_does_not_end_queue() {
        let mut h = Harness::new().await;
        h.catalog.radio_page("a@start", &[], Some("c1"));
        h.catalog.radio_page("a@c1", &["r1"], None);
        let _release = h.catalog.hold_radio("a@c1");

        assert_eq!(h.binder.start_radio(item("a")).outcome().await.unwrap(), 0);
        let load = h.play_next_load().await;
        h.emit(PipelineEvent::Ended {
            load_id: load.load_id,
        });
        h.wait_for(|s| s.state == PlaybackState::Buffering).await;

        let mut events = h.binder.subscribe();
        h.binder.player().force_play(item("b")).await.unwrap();

        let mut seen = Vec::new();
        wait_event(&mut events, |event| {
            seen.push(event.clone());
            matches!(event, PlaybackEvent::TrackChanged { .. })
        })
        .await;

        assert!(
            !seen.contains(&PlaybackEvent::QueueEnded),
            "unexpected end of queue: {seen:?}"
        );
        let next = h.next_load().await;
        assert_eq!(next.track_id, TrackId::new("b"));
        assert!(!h.binder.snapshot().radio_active);
    }

    #[tokio::test]
    async fn stopping_radio_while_waiting_ends_queue() {
        let mut h = Harness::new().await;
        h.catalog.radio_page("a@start", &[], Some("c1"));
        h.catalog.radio_page("a@c1", &["r1"], None);
        let _release = h.catalog.hold_radio("a@c1");

        h.binder.start_radio(item("a")).outcome().await.unwrap();
        let load = h.play_next_load().await;
        h.emit(PipelineEvent::Ended {
            load_id: load.load_id,
        });
        h.wait_for(|s| s.state == PlaybackState::Buffering).await;

        let mut events = h.binder.subscribe();
        h.binder.stop_radio().await.unwrap();

        wait_event(&mut events, |event| *event == PlaybackEvent::QueueEnded).await;
        assert_eq!(h.binder.snapshot().state, PlaybackState::Ended);
    }

    #[tokio::test]
    async fn force_play_stops_radio() {
        let mut h = Harness::new().await;
        h.catalog.radio_page("a@start", &["r1"], None);
        h.binder.start_radio(item("a")).outcome().await.unwrap();
        h.next_load().await;

        h.binder.player().force_play(item("b")).await.unwrap();

        let snapshot = h.binder.snapshot();
        assert!(!snapshot.radio_active);
        assert_eq!(ids(&snapshot), vec!["b"]);
    }
}

// ============================================================================
// Library and cache integration
// ============================================================================

mod library {
    use super::*;

    #[tokio::test]
    async fn play_time_is_recorded_when_leaving_a_track() {
        let mut h = Harness::with_store().await;
        let store = h.store.clone().unwrap();

        h.binder.player().force_play(item("a")).await.unwrap();
        h.play_next_load().await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        h.binder.player().force_play(item("b")).await.unwrap();

        let played = timeout(TIMEOUT, async {
            loop {
                if let Some(track) = store.get_track(&TrackId::new("a")).await.unwrap() {
                    if track.total_play_time_ms > 0 {
                        return track.total_play_time_ms;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("play time never recorded");

        assert!(played >= 50, "recorded {played}ms");
    }

    #[tokio::test]
    async fn play_time_is_saved_before_shutdown_returns() {
        let mut h = Harness::with_store().await;
        let store = h.store.clone().unwrap();

        h.binder.player().force_play(item("a")).await.unwrap();
        h.play_next_load().await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        h.binder.shutdown().await;

        let track = store
            .get_track(&TrackId::new("a"))
            .await
            .unwrap()
            .expect("track recorded on load");
        assert!(
            track.total_play_time_ms >= 50,
            "recorded {}ms",
            track.total_play_time_ms
        );
    }

    #[tokio::test]
    async fn stream_details_are_recorded() {
        let mut h = Harness::with_store().await;
        let store = h.store.clone().unwrap();
        h.catalog.set_loudness("a", -3.5);

        h.binder.player().force_play(item("a")).await.unwrap();
        h.next_load().await;

        let track = timeout(TIMEOUT, async {
            loop {
                if let Some(track) = store.get_track(&TrackId::new("a")).await.unwrap() {
                    if track.content_length.is_some() {
                        return track;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("stream details never recorded");

        assert_eq!(track.content_length, Some(4096));
        assert_eq!(track.loudness_db, Some(-3.5));
        assert_eq!(
            h.binder.cache().content_length(&TrackId::new("a")).unwrap(),
            Some(4096)
        );
    }

    #[tokio::test]
    async fn delete_track_clears_cache_and_library() {
        let h = Harness::with_store().await;
        let store = h.store.clone().unwrap();
        let id = TrackId::new("a");
        store.insert_track(&Track::new(id.clone(), "A")).await.unwrap();
        h.binder.cache().store(&id, 0, b"audio").unwrap();

        let outcome = h.binder.delete_track(&id).await.unwrap();

        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(store.get_track(&id).await.unwrap().is_none());
        assert_eq!(h.binder.cache().cached_bytes(&id).unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_track_defers_while_streaming() {
        let h = Harness::new().await;
        let id = TrackId::new("a");
        h.binder.cache().store(&id, 0, b"audio").unwrap();
        let handle = h.binder.cache().open(&id).unwrap();

        let outcome = h.binder.delete_track(&id).await.unwrap();

        assert_eq!(outcome, RemoveOutcome::Deferred);
        drop(handle);
        assert_eq!(h.binder.cache().cached_bytes(&id).unwrap(), 0);
    }
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn shutdown_releases_pipeline_and_closes_session() {
    let mut h = Harness::new().await;
    h.binder.player().force_play(item("a")).await.unwrap();
    h.next_load().await;

    let player = h.binder.player().clone();
    let pipeline = Arc::clone(&h.pipeline);
    h.binder.shutdown().await;

    assert!(pipeline.calls.lock().unwrap().contains(&"release".to_string()));
    assert!(matches!(
        player.play().await,
        Err(PlaybackError::SessionClosed)
    ));
}

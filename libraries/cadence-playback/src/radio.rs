//! Radio controller: recommendation continuations appended to the queue
//!
//! At most one session is active. Each session gets a fresh generation
//! number; fetch results carry the generation they were started for and are
//! dropped unless it still matches the active session.

use crate::error::{PlaybackError, Result};
use cadence_core::{CatalogService, CatalogSong, RadioEndpoint, RadioPage, TrackId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Fetch result delivered back to the session actor
#[derive(Debug)]
pub struct RadioFetched {
    pub generation: u64,
    pub result: cadence_core::Result<RadioPage>,
}

/// Pending outcome of `setup_radio`
///
/// Resolves to the number of appended items once the first page is in, or
/// to the error that prevented it.
#[derive(Debug)]
pub struct RadioStart {
    receiver: oneshot::Receiver<Result<usize>>,
}

impl RadioStart {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<usize>>) -> Self {
        Self { receiver }
    }

    /// Wait for the first page
    pub async fn outcome(self) -> Result<usize> {
        self.receiver
            .await
            .unwrap_or(Err(PlaybackError::SessionClosed))
    }
}

#[derive(Debug)]
struct RadioSession {
    endpoint: RadioEndpoint,
    generation: u64,
    continuation: Option<String>,
    first_page_done: bool,
    /// Seed to drop from the first page
    seed: Option<TrackId>,
    reply: Option<oneshot::Sender<Result<usize>>>,
}

/// Owns the radio session and its in-flight fetch
pub struct RadioController {
    catalog: Arc<dyn CatalogService>,
    results: mpsc::UnboundedSender<RadioFetched>,
    session: Option<RadioSession>,
    next_generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl RadioController {
    pub fn new(catalog: Arc<dyn CatalogService>, results: mpsc::UnboundedSender<RadioFetched>) -> Self {
        Self {
            catalog,
            results,
            session: None,
            next_generation: 1,
            in_flight: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Generation of the active session
    pub fn generation(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.generation)
    }

    /// Replace any active session and fetch the first page
    ///
    /// `current` is the id of the item playing now; it is dropped from the
    /// first page.
    pub fn start(
        &mut self,
        endpoint: RadioEndpoint,
        current: Option<TrackId>,
        reply: oneshot::Sender<Result<usize>>,
    ) {
        self.stop();

        if !endpoint.is_valid() {
            let _ = reply.send(Err(PlaybackError::InvalidEndpoint));
            return;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        info!(
            generation,
            video_id = ?endpoint.video_id,
            playlist_id = ?endpoint.playlist_id,
            "Starting radio"
        );

        self.session = Some(RadioSession {
            endpoint,
            generation,
            continuation: None,
            first_page_done: false,
            seed: current,
            reply: Some(reply),
        });
        self.spawn_fetch();
    }

    /// Cancel the in-flight fetch and end the session; appended items stay
    pub fn stop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        if let Some(mut session) = self.session.take() {
            debug!(generation = session.generation, "Stopping radio");
            if let Some(reply) = session.reply.take() {
                let _ = reply.send(Err(PlaybackError::RadioCancelled));
            }
        }
    }

    /// Fetch the next page if the queue is running low
    ///
    /// Returns `true` if a fetch was started.
    pub fn extend_if_needed(&mut self, remaining: usize, low_watermark: usize) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        if self.in_flight.is_some()
            || !session.first_page_done
            || session.continuation.is_none()
            || remaining > low_watermark
        {
            return false;
        }

        debug!(generation = session.generation, remaining, "Extending radio");
        self.spawn_fetch();
        true
    }

    fn spawn_fetch(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        let catalog = Arc::clone(&self.catalog);
        let results = self.results.clone();
        let endpoint = session.endpoint.clone();
        let continuation = session.continuation.clone();
        let generation = session.generation;

        self.in_flight = Some(tokio::spawn(async move {
            let result = catalog.next(&endpoint, continuation.as_deref()).await;
            let _ = results.send(RadioFetched { generation, result });
        }));
    }

    /// Accept a fetch result
    ///
    /// Returns the songs to append, or `None` if the result is stale. The
    /// reply for the first page is resolved by `settle_first_page`.
    pub fn accept(&mut self, fetched: RadioFetched) -> Option<Result<Vec<CatalogSong>>> {
        let session = self
            .session
            .as_mut()
            .filter(|s| s.generation == fetched.generation)?;
        self.in_flight = None;

        match fetched.result {
            Ok(page) => {
                let mut items = page.items;
                if !session.first_page_done {
                    if let Some(seed) = &session.seed {
                        items.retain(|song| &song.id != seed);
                    }
                }
                session.first_page_done = true;
                session.continuation = page.continuation;
                Some(Ok(items))
            }
            Err(err) => Some(Err(err.into())),
        }
    }

    /// Resolve the `setup_radio` caller once the first page is settled
    ///
    /// A failed first page also ends the session so the caller can retry.
    pub fn settle_first_page(&mut self, outcome: Result<usize>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let failed = outcome.is_err();
        if let Some(reply) = session.reply.take() {
            let _ = reply.send(outcome);
        }
        if failed && !session.first_page_done {
            self.session = None;
        }
    }

    /// Whether the active session has yet to deliver its first page
    pub fn awaiting_first_page(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.first_page_done)
    }
}

impl Drop for RadioController {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

//! Paged search with stale-page protection.

use cadence_core::{CatalogService, SearchFilter, SearchItem};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Result of `SearchPager::load_more`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Items were appended to the current results
    Appended(usize),
    /// The query changed while the page was in flight; page dropped
    Stale,
    /// No more pages for the current query
    Exhausted,
}

#[derive(Debug, Default)]
struct PagerState {
    generation: u64,
    query: Option<(String, SearchFilter)>,
    items: Vec<SearchItem>,
    continuation: Option<String>,
    exhausted: bool,
}

/// Accumulates search results page by page for the current query.
///
/// Changing the query bumps a generation counter; a page fetched for an older
/// generation is discarded instead of being appended.
pub struct SearchPager {
    catalog: Arc<dyn CatalogService>,
    state: Mutex<PagerState>,
}

impl SearchPager {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self {
            catalog,
            state: Mutex::new(PagerState::default()),
        }
    }

    /// Replace the query and clear accumulated results.
    pub async fn set_query(&self, query: impl Into<String>, filter: SearchFilter) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.query = Some((query.into(), filter));
        state.items.clear();
        state.continuation = None;
        state.exhausted = false;
    }

    /// Fetch the next page for the current query.
    ///
    /// The lock is released while the request is in flight.
    pub async fn load_more(&self) -> cadence_core::Result<PageOutcome> {
        let (generation, query, filter, continuation) = {
            let state = self.state.lock().await;
            let Some((query, filter)) = state.query.clone() else {
                return Ok(PageOutcome::Exhausted);
            };
            if state.exhausted {
                return Ok(PageOutcome::Exhausted);
            }
            (state.generation, query, filter, state.continuation.clone())
        };

        let page = self
            .catalog
            .search(&query, filter, continuation.as_deref())
            .await?;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(query = %query, "Dropping search page for superseded query");
            return Ok(PageOutcome::Stale);
        }

        let appended = page.items.len();
        state.items.extend(page.items);
        state.exhausted = page.continuation.is_none();
        state.continuation = page.continuation;

        Ok(PageOutcome::Appended(appended))
    }

    /// Snapshot of the accumulated results.
    pub async fn items(&self) -> Vec<SearchItem> {
        self.state.lock().await.items.clone()
    }

    /// Whether another page may exist.
    pub async fn has_more(&self) -> bool {
        let state = self.state.lock().await;
        state.query.is_some() && !state.exhausted
    }
}

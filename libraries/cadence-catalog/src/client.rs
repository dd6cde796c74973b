//! HTTP catalog client.

use crate::error::{CatalogError, Result};
use crate::types::{CatalogConfig, ErrorBody, NextRequest};
use async_trait::async_trait;
use cadence_core::{
    CatalogService, CatalogSong, RadioEndpoint, RadioPage, SearchFilter, SearchPage, StreamInfo,
    TrackId,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Client for the remote music catalog.
///
/// Implements [`CatalogService`] over a small JSON API:
///
/// | Operation     | Request                                  |
/// |---------------|------------------------------------------|
/// | `search`      | `GET  /search?query=&filter=&continuation=` |
/// | `song`        | `GET  /songs/{id}`                       |
/// | `queue`       | `GET  /playlists/{id}/songs`             |
/// | `next`        | `POST /next`                             |
/// | `stream_info` | `GET  /songs/{id}/stream`                |
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    http: Client,
    base_url: Url,
}

impl HttpCatalog {
    /// Create a new client with the given configuration.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(CatalogError::InvalidUrl("URL cannot be empty".into()));
        }

        let normalized = format!("{}/", config.base_url.trim_end_matches('/'));
        if !normalized.starts_with("http://") && !normalized.starts_with("https://") {
            return Err(CatalogError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        let base_url =
            Url::parse(&normalized).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(language) = &config.language {
            if let Ok(value) = reqwest::header::HeaderValue::from_str(language) {
                headers.insert(reqwest::header::ACCEPT_LANGUAGE, value);
            }
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Cadence/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Get the catalog base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Get the underlying HTTP client, shared with the audio stream fetcher.
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CatalogError::InvalidUrl("URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode the JSON body, mapping 404 to `None`.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<Option<T>> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                CatalogError::Unreachable(e.to_string())
            } else {
                CatalogError::Request(e)
            }
        })?;

        let status = response.status();

        if status.is_success() {
            let body: T = response.json().await.map_err(|e| {
                CatalogError::ParseError(format!("Failed to parse {} response: {}", what, e))
            })?;
            Ok(Some(body))
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.message)
                .unwrap_or(error_text);

            warn!(status = status.as_u16(), message = %message, "Catalog request failed");
            Err(CatalogError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Search the catalog.
    pub async fn search(
        &self,
        query: &str,
        filter: SearchFilter,
        continuation: Option<&str>,
    ) -> Result<SearchPage> {
        let mut url = self.endpoint(&["search"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            pairs.append_pair("filter", filter.as_param());
            if let Some(token) = continuation {
                pairs.append_pair("continuation", token);
            }
        }

        debug!(query = %query, filter = filter.as_param(), paged = continuation.is_some(), "Searching catalog");

        let page: SearchPage = self
            .fetch(self.http.get(url), "search")
            .await?
            .unwrap_or_default();

        debug!(items = page.items.len(), more = page.continuation.is_some(), "Search page received");
        Ok(page)
    }

    /// Get a single song.
    pub async fn song(&self, id: &TrackId) -> Result<Option<CatalogSong>> {
        let url = self.endpoint(&["songs", id.as_str()])?;
        debug!(track_id = %id, "Fetching song");

        self.fetch(self.http.get(url), "song").await
    }

    /// Get the songs of a playlist.
    pub async fn queue(&self, playlist_id: &str) -> Result<Option<Vec<CatalogSong>>> {
        let url = self.endpoint(&["playlists", playlist_id, "songs"])?;
        debug!(playlist_id = %playlist_id, "Fetching playlist queue");

        self.fetch(self.http.get(url), "queue").await
    }

    /// Get the next page of radio recommendations.
    pub async fn next(
        &self,
        endpoint: &RadioEndpoint,
        continuation: Option<&str>,
    ) -> Result<RadioPage> {
        if !endpoint.is_valid() {
            return Err(CatalogError::InvalidEndpoint);
        }

        let url = self.endpoint(&["next"])?;
        debug!(
            video_id = ?endpoint.video_id,
            playlist_id = ?endpoint.playlist_id,
            paged = continuation.is_some(),
            "Fetching radio continuation"
        );

        let body = NextRequest {
            endpoint,
            continuation,
        };
        let page: RadioPage = self
            .fetch(self.http.post(url).json(&body), "next")
            .await?
            .unwrap_or_default();

        debug!(items = page.items.len(), more = page.continuation.is_some(), "Radio page received");
        Ok(page)
    }

    /// Resolve the stream of a song.
    pub async fn stream_info(&self, id: &TrackId) -> Result<StreamInfo> {
        let url = self.endpoint(&["songs", id.as_str(), "stream"])?;
        debug!(track_id = %id, "Resolving stream");

        self.fetch(self.http.get(url), "stream")
            .await?
            .ok_or_else(|| CatalogError::NotFound {
                entity: "Stream",
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    async fn search(
        &self,
        query: &str,
        filter: SearchFilter,
        continuation: Option<&str>,
    ) -> cadence_core::Result<SearchPage> {
        Ok(HttpCatalog::search(self, query, filter, continuation).await?)
    }

    async fn song(&self, id: &TrackId) -> cadence_core::Result<Option<CatalogSong>> {
        Ok(HttpCatalog::song(self, id).await?)
    }

    async fn queue(&self, playlist_id: &str) -> cadence_core::Result<Option<Vec<CatalogSong>>> {
        Ok(HttpCatalog::queue(self, playlist_id).await?)
    }

    async fn next(
        &self,
        endpoint: &RadioEndpoint,
        continuation: Option<&str>,
    ) -> cadence_core::Result<RadioPage> {
        Ok(HttpCatalog::next(self, endpoint, continuation).await?)
    }

    async fn stream_info(&self, id: &TrackId) -> cadence_core::Result<StreamInfo> {
        Ok(HttpCatalog::stream_info(self, id).await?)
    }
}

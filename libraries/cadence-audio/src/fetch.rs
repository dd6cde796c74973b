//! HTTP range fetching for progressive streams

use crate::error::{AudioError, Result};
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use std::ops::Range;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Bytes returned for a range request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRange {
    /// Offset of `bytes[0]` within the resource
    ///
    /// Servers that ignore `Range` answer from offset 0.
    pub offset: u64,
    pub bytes: Vec<u8>,
    /// Total resource size, when the server reported it
    pub total_len: Option<u64>,
}

/// Blocking byte-range source, called from the decoder thread
pub trait RangeFetcher: Send + Sync {
    fn fetch(&self, url: &str, range: Range<u64>) -> Result<FetchedRange>;
}

/// Range fetcher backed by reqwest
///
/// Requests run on the given tokio runtime; `fetch` blocks the calling
/// thread, which must not be a runtime worker.
pub struct HttpRangeFetcher {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpRangeFetcher {
    pub fn new(runtime: Handle, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cadence/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, runtime })
    }

    async fn fetch_async(&self, url: &str, range: Range<u64>) -> Result<FetchedRange> {
        let response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={}-{}", range.start, range.end.saturating_sub(1)))
            .send()
            .await?;

        let status = response.status();
        let total_len = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(FetchedRange {
                offset: range.start,
                bytes: Vec::new(),
                total_len,
            });
        }
        if !status.is_success() {
            return Err(AudioError::Status(status.as_u16()));
        }

        let partial = status == StatusCode::PARTIAL_CONTENT;
        let body_len = response.content_length();
        let bytes = response.bytes().await?.to_vec();

        let (offset, total_len) = if partial {
            (range.start, total_len)
        } else {
            // Range ignored: the body is the whole resource
            (0, body_len.or(Some(bytes.len() as u64)))
        };

        debug!(url, offset, len = bytes.len(), ?total_len, "Fetched range");
        Ok(FetchedRange {
            offset,
            bytes,
            total_len,
        })
    }
}

impl RangeFetcher for HttpRangeFetcher {
    fn fetch(&self, url: &str, range: Range<u64>) -> Result<FetchedRange> {
        self.runtime.block_on(self.fetch_async(url, range))
    }
}

/// Total length from a `Content-Range` value (`bytes 0-99/1234`, `bytes */1234`)
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().strip_prefix("bytes")?.rsplit_once('/')?;
    total.trim().parse().ok()
}

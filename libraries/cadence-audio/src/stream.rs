//! Seekable byte stream that reads through the audio cache
//!
//! Reads are served from the cache when the bytes are there; otherwise the
//! missing chunk is fetched over HTTP, stored, and then served. Holding a
//! `CacheHandle` pins the entry so removals wait until the stream is dropped.

use crate::error::AudioError;
use crate::fetch::RangeFetcher;
use cadence_cache::{CacheHandle, CacheRead};
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use symphonia::core::io::MediaSource;
use tracing::{debug, warn};

/// Bytes requested per network fetch
pub const FETCH_CHUNK: u64 = 256 * 1024;

pub struct CachedStream {
    handle: CacheHandle,
    fetcher: Arc<dyn RangeFetcher>,
    url: String,
    content_length: Option<u64>,
    position: u64,
}

impl CachedStream {
    /// `content_length` seeds the known size; otherwise the cache's recorded
    /// length or the first response's `Content-Range` is used
    pub fn new(
        handle: CacheHandle,
        fetcher: Arc<dyn RangeFetcher>,
        url: impl Into<String>,
        content_length: Option<u64>,
    ) -> Result<Self, AudioError> {
        let content_length = match content_length {
            Some(len) => {
                handle.set_content_length(len)?;
                Some(len)
            }
            None => handle.content_length()?,
        };

        Ok(Self {
            handle,
            fetcher,
            url: url.into(),
            content_length,
            position: 0,
        })
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn fetch_missing(&mut self, start: u64) -> Result<(), AudioError> {
        let end = match self.content_length {
            Some(len) => (start + FETCH_CHUNK).min(len),
            None => start + FETCH_CHUNK,
        };

        debug!(track_id = %self.handle.track_id(), start, end, "Cache miss, fetching");
        let fetched = self.fetcher.fetch(&self.url, start..end)?;

        if self.content_length.is_none() {
            if let Some(total) = fetched.total_len {
                self.handle.set_content_length(total)?;
                self.content_length = Some(total);
            }
        }

        if !fetched.bytes.is_empty() {
            // A server that ignored the range may send more than the declared length
            let mut bytes = fetched.bytes.as_slice();
            if let Some(len) = self.content_length {
                let max = len.saturating_sub(fetched.offset) as usize;
                if bytes.len() > max {
                    warn!(track_id = %self.handle.track_id(), "Stream longer than declared length");
                    bytes = &bytes[..max];
                }
            }
            self.handle.store(fetched.offset, bytes)?;
        }
        Ok(())
    }

    fn read_cached(&self, buf: &mut [u8]) -> Result<Option<usize>, AudioError> {
        let end = self.position + buf.len() as u64;
        let end = self.content_length.map_or(end, |len| end.min(len));

        match self.handle.read(self.position..end)? {
            CacheRead::Hit(bytes) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(Some(bytes.len()))
            }
            CacheRead::Miss => Ok(None),
        }
    }
}

impl Read for CachedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.content_length.is_some_and(|len| self.position >= len) {
            return Ok(0);
        }

        let read = match self.read_cached(buf).map_err(io::Error::other)? {
            Some(n) => n,
            None => {
                self.fetch_missing(self.position).map_err(io::Error::other)?;
                // Nothing came back: end of stream
                self.read_cached(buf).map_err(io::Error::other)?.unwrap_or(0)
            }
        };

        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for CachedStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let len = self.content_length.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Unsupported, "stream length unknown")
                })?;
                len.checked_add_signed(delta)
            }
        };

        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;
        self.position = target;
        Ok(target)
    }
}

impl MediaSource for CachedStream {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.content_length
    }
}

//! Cadence audio cache
//!
//! Content-addressed on-disk store for streamed audio, keyed by track id.
//!
//! Bytes arrive progressively as byte ranges (whatever the stream happened to
//! download) and are written at their offset into one file per track. A
//! JSON index next to the files records which ranges are present, the
//! expected content length, and when each entry was last touched, so the
//! cache survives restarts and can evict least-recently-used entries.
//!
//! Readers pin an entry with [`AudioCache::open`]. Removing a pinned entry is
//! deferred until its last [`CacheHandle`] is dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_cache::{AudioCache, CacheConfig, CacheRead};
//! use cadence_core::TrackId;
//! use std::sync::Arc;
//!
//! # fn main() -> cadence_cache::Result<()> {
//! let cache = Arc::new(AudioCache::new(CacheConfig::new("/tmp/cadence-cache"))?);
//! let id = TrackId::new("dQw4w9WgXcQ");
//!
//! cache.store(&id, 0, b"ID3...")?;
//! match cache.read(&id, 0..6)? {
//!     CacheRead::Hit(bytes) => assert_eq!(bytes.len(), 6),
//!     CacheRead::Miss => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod cache;
mod error;
mod index;
mod ranges;

pub use cache::{AudioCache, CacheConfig, CacheHandle, CacheRead, CacheStats, RemoveOutcome};
pub use error::{CacheError, Result};
pub use ranges::RangeSet;

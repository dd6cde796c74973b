//! Cadence Audio
//!
//! Decoding pipeline for the Cadence playback engine.
//!
//! # Architecture
//!
//! - [`CachedStream`]: `Read + Seek` over a track's audio, served from the
//!   `cadence-cache` store and filled by HTTP range requests on a miss
//! - [`StreamDecoder`]: symphonia probe + decode to interleaved stereo f32
//! - [`DecodingPipeline`]: implements `cadence_playback::AudioPipeline` with
//!   a dedicated decoder thread driven over a crossbeam channel
//! - [`PcmSink`]: where decoded audio goes ([`PacedSink`] when there is no
//!   device, [`MemorySink`] to capture output)
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_audio::{DecodingPipeline, HttpRangeFetcher, PacedSink};
//! use cadence_cache::{AudioCache, CacheConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let cache = Arc::new(AudioCache::new(CacheConfig::new("/tmp/cadence-cache"))?);
//! let fetcher = Arc::new(HttpRangeFetcher::new(runtime.handle().clone(), Duration::from_secs(30))?);
//!
//! let pipeline = DecodingPipeline::new(cache, fetcher, Box::new(PacedSink::new()));
//! # Ok(())
//! # }
//! ```

mod decoder;
mod error;
mod fetch;
mod pipeline;
mod sink;
mod stream;

pub use decoder::{PcmChunk, StreamDecoder};
pub use error::{AudioError, Result};
pub use fetch::{parse_content_range_total, FetchedRange, HttpRangeFetcher, RangeFetcher};
pub use pipeline::DecodingPipeline;
pub use sink::{MemorySink, PacedSink, PcmSink};
pub use stream::{CachedStream, FETCH_CHUNK};

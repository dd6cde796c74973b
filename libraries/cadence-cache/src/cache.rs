//! The audio cache and its read handles

use crate::error::{CacheError, Result};
use crate::index::{CacheEntry, CacheIndex};
use cadence_core::TrackId;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default size limit: 512 MiB
const DEFAULT_MAX_BYTES: u64 = 512 * 1024 * 1024;

/// Audio cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the audio files and `index.json`
    pub dir: PathBuf,

    /// Eviction threshold for the sum of cached bytes
    pub max_bytes: u64,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRead {
    /// Bytes starting at the requested offset
    ///
    /// Shorter than requested when the cached run (or the content) ends
    /// before the requested end.
    Hit(Vec<u8>),

    /// The requested offset is not cached
    Miss,
}

/// Result of `AudioCache::remove_resource`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Bytes and index entry deleted
    Removed,

    /// A handle is open; removal runs when the last one is dropped
    Deferred,

    /// Nothing was cached for the track
    NotCached,
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
}

#[derive(Default)]
struct CacheState {
    index: CacheIndex,
    open_handles: HashMap<TrackId, usize>,
    pending_removal: HashSet<TrackId>,
}

/// On-disk audio cache
///
/// All operations, including file IO, run under one mutex. Calls are short
/// (a single seek + read or write) so contention stays low.
pub struct AudioCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl AudioCache {
    /// Open (or create) a cache rooted at `config.dir`
    ///
    /// Index entries whose audio file has disappeared are dropped.
    pub fn new(config: CacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.dir)?;

        let mut index = CacheIndex::load(&config.dir);
        index
            .entries
            .retain(|id, _| resource_path(&config.dir, id).exists());

        tracing::info!(
            dir = %config.dir.display(),
            entries = index.entries.len(),
            total_bytes = index.total_bytes(),
            "Audio cache opened"
        );

        Ok(Self {
            config,
            state: Mutex::new(CacheState {
                index,
                ..CacheState::default()
            }),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `bytes` at `offset` for a track
    ///
    /// Storing a range that is already present is a no-op. Writes ending past
    /// a known content length are rejected. Writes for a track with a
    /// deferred removal are discarded.
    pub fn store(&self, track_id: &TrackId, offset: u64, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or_else(|| CacheError::RangeOverflow {
                track_id: track_id.clone(),
                offset,
            })?;

        let mut state = self.lock()?;
        if state.pending_removal.contains(track_id) {
            tracing::debug!(track_id = %track_id, "Discarding write for track pending removal");
            return Ok(());
        }

        let entry = state
            .index
            .entries
            .entry(track_id.clone())
            .or_insert_with(CacheEntry::new);

        if let Some(content_length) = entry.content_length {
            if end > content_length {
                return Err(CacheError::BeyondContentLength {
                    track_id: track_id.clone(),
                    end,
                    content_length,
                });
            }
        }

        entry.touch();
        if entry.ranges.contains(offset..end) {
            return Ok(());
        }

        let path = resource_path(&self.config.dir, track_id);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;

        entry.ranges.insert(offset..end);
        tracing::trace!(track_id = %track_id, offset, len = bytes.len(), "Stored audio range");

        self.evict_locked(&mut state, track_id);
        state.index.save(&self.config.dir)
    }

    /// Read cached bytes starting at `range.start`
    pub fn read(&self, track_id: &TrackId, range: Range<u64>) -> Result<CacheRead> {
        if range.start >= range.end {
            return Ok(CacheRead::Hit(Vec::new()));
        }

        let mut state = self.lock()?;
        let Some(entry) = state.index.entries.get_mut(track_id) else {
            return Ok(CacheRead::Miss);
        };
        let Some(covered_end) = entry.ranges.covered_end(range.start) else {
            return Ok(CacheRead::Miss);
        };

        let end = range.end.min(covered_end);
        let len = (end - range.start) as usize;
        entry.touch();

        let path = resource_path(&self.config.dir, track_id);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(track_id = %track_id, "Cached file vanished, dropping entry");
                state.index.entries.remove(track_id);
                return Ok(CacheRead::Miss);
            }
            Err(e) => return Err(e.into()),
        };

        let mut buf = vec![0u8; len];
        file.seek(SeekFrom::Start(range.start))?;
        file.read_exact(&mut buf)?;
        Ok(CacheRead::Hit(buf))
    }

    /// Pin a track's entry for reading
    pub fn open(self: &Arc<Self>, track_id: &TrackId) -> Result<CacheHandle> {
        let mut state = self.lock()?;
        *state.open_handles.entry(track_id.clone()).or_insert(0) += 1;

        Ok(CacheHandle {
            cache: Arc::clone(self),
            track_id: track_id.clone(),
        })
    }

    /// Delete every cached byte of a track
    pub fn remove_resource(&self, track_id: &TrackId) -> Result<RemoveOutcome> {
        let mut state = self.lock()?;

        // An open stream may still write, even if nothing is stored yet
        if state.open_handles.get(track_id).copied().unwrap_or(0) > 0 {
            state.pending_removal.insert(track_id.clone());
            tracing::debug!(track_id = %track_id, "Cache removal deferred until handles close");
            return Ok(RemoveOutcome::Deferred);
        }

        if self.remove_locked(&mut state, track_id)? {
            state.index.save(&self.config.dir)?;
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::NotCached)
        }
    }

    /// Record the expected total size of a track's audio
    ///
    /// Fails if bytes past `content_length` are already stored.
    pub fn set_content_length(&self, track_id: &TrackId, content_length: u64) -> Result<()> {
        let mut state = self.lock()?;
        let entry = state
            .index
            .entries
            .entry(track_id.clone())
            .or_insert_with(CacheEntry::new);

        if entry.ranges.max_end() > content_length {
            return Err(CacheError::BeyondContentLength {
                track_id: track_id.clone(),
                end: entry.ranges.max_end(),
                content_length,
            });
        }
        if entry.content_length == Some(content_length) {
            return Ok(());
        }

        entry.content_length = Some(content_length);
        state.index.save(&self.config.dir)
    }

    pub fn content_length(&self, track_id: &TrackId) -> Result<Option<u64>> {
        let state = self.lock()?;
        Ok(state
            .index
            .entries
            .get(track_id)
            .and_then(|e| e.content_length))
    }

    /// Whether all bytes up to the content length are cached
    pub fn is_complete(&self, track_id: &TrackId) -> Result<bool> {
        let state = self.lock()?;
        Ok(state
            .index
            .entries
            .get(track_id)
            .is_some_and(CacheEntry::is_complete))
    }

    /// Bytes cached for one track
    pub fn cached_bytes(&self, track_id: &TrackId) -> Result<u64> {
        let state = self.lock()?;
        Ok(state
            .index
            .entries
            .get(track_id)
            .map_or(0, |e| e.ranges.len()))
    }

    /// Bytes cached across all tracks
    pub fn total_bytes(&self) -> Result<u64> {
        Ok(self.lock()?.index.total_bytes())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let state = self.lock()?;
        Ok(CacheStats {
            entries: state.index.entries.len(),
            total_bytes: state.index.total_bytes(),
            max_bytes: self.config.max_bytes,
        })
    }

    /// Write the in-memory index (access times included) to disk
    pub fn flush(&self) -> Result<()> {
        self.lock()?.index.save(&self.config.dir)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Remove entry and file; `Ok(false)` if there was no entry
    fn remove_locked(&self, state: &mut CacheState, track_id: &TrackId) -> Result<bool> {
        state.pending_removal.remove(track_id);
        if state.index.entries.remove(track_id).is_none() {
            return Ok(false);
        }

        match fs::remove_file(resource_path(&self.config.dir, track_id)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(track_id = %track_id, "Removed cached audio");
        Ok(true)
    }

    /// Evict least-recently-used unpinned entries until under `max_bytes`
    ///
    /// `keep` (the track just written) is evicted last.
    fn evict_locked(&self, state: &mut CacheState, keep: &TrackId) {
        let mut total = state.index.total_bytes();
        if total <= self.config.max_bytes {
            return;
        }

        let mut candidates: Vec<(TrackId, chrono::DateTime<chrono::Utc>, u64)> = state
            .index
            .entries
            .iter()
            .filter(|(id, _)| *id != keep && !state.open_handles.contains_key(*id))
            .map(|(id, e)| (id.clone(), e.last_accessed, e.ranges.len()))
            .collect();
        candidates.sort_by_key(|(_, accessed, _)| *accessed);

        for (id, _, size) in candidates {
            if total <= self.config.max_bytes {
                break;
            }
            match self.remove_locked(state, &id) {
                Ok(_) => {
                    total = total.saturating_sub(size);
                    tracing::debug!(track_id = %id, size, "Evicted cached audio");
                }
                Err(e) => tracing::warn!(track_id = %id, error = %e, "Failed to evict cached audio"),
            }
        }
    }

    fn release(&self, track_id: &TrackId) {
        let Ok(mut state) = self.lock() else {
            tracing::error!(track_id = %track_id, "Cache lock poisoned while releasing handle");
            return;
        };

        let remaining = match state.open_handles.get_mut(track_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining > 0 {
            return;
        }
        state.open_handles.remove(track_id);

        if state.pending_removal.contains(track_id) {
            let result = self
                .remove_locked(&mut state, track_id)
                .and_then(|_| state.index.save(&self.config.dir));
            if let Err(e) = result {
                tracing::warn!(track_id = %track_id, error = %e, "Deferred cache removal failed");
            }
        }
    }
}

/// Read handle pinning one track's cache entry
///
/// While any handle for a track is alive the entry is neither evicted nor
/// removed.
pub struct CacheHandle {
    cache: Arc<AudioCache>,
    track_id: TrackId,
}

impl CacheHandle {
    pub fn track_id(&self) -> &TrackId {
        &self.track_id
    }

    pub fn read(&self, range: Range<u64>) -> Result<CacheRead> {
        self.cache.read(&self.track_id, range)
    }

    pub fn store(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.cache.store(&self.track_id, offset, bytes)
    }

    pub fn content_length(&self) -> Result<Option<u64>> {
        self.cache.content_length(&self.track_id)
    }

    pub fn set_content_length(&self, content_length: u64) -> Result<()> {
        self.cache.set_content_length(&self.track_id, content_length)
    }
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        self.cache.release(&self.track_id);
    }
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle")
            .field("track_id", &self.track_id)
            .finish_non_exhaustive()
    }
}

/// `<dir>/<hex(track_id)>.audio`
fn resource_path(dir: &Path, track_id: &TrackId) -> PathBuf {
    let hex: String = track_id
        .as_str()
        .bytes()
        .map(|b| format!("{b:02x}"))
        .collect();
    dir.join(format!("{hex}.audio"))
}

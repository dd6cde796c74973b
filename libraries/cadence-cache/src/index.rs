//! Persistent cache index (`index.json`)

use crate::error::Result;
use crate::ranges::RangeSet;
use cadence_core::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub(crate) const INDEX_FILE: &str = "index.json";

/// What is known about one cached track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheEntry {
    pub ranges: RangeSet,
    pub content_length: Option<u64>,
    pub last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new() -> Self {
        Self {
            ranges: RangeSet::new(),
            content_length: None,
            last_accessed: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    pub fn is_complete(&self) -> bool {
        self.content_length
            .is_some_and(|len| len == 0 || self.ranges.contains(0..len))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CacheIndex {
    pub entries: BTreeMap<TrackId, CacheEntry>,
}

impl CacheIndex {
    /// Load the index from `dir`, starting empty if it is missing or unreadable
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(INDEX_FILE);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read cache index, starting empty");
                return Self::default();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt cache index, starting empty");
                Self::default()
            }
        }
    }

    /// Write the index atomically (temp file + rename)
    pub fn save(&self, dir: &Path) -> Result<()> {
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec(self)?)?;
        fs::rename(tmp, dir.join(INDEX_FILE))?;
        Ok(())
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.ranges.len()).sum()
    }
}

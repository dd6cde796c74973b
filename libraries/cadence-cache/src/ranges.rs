//! Sorted set of half-open byte ranges

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Disjoint, sorted, coalesced set of `[start, end)` byte ranges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeSet {
    ranges: Vec<(u64, u64)>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range, merging it with any range it overlaps or touches
    pub fn insert(&mut self, range: Range<u64>) {
        if range.start >= range.end {
            return;
        }

        let mut start = range.start;
        let mut end = range.end;

        // First range that could merge: its end reaches our start
        let first = self.ranges.partition_point(|&(_, e)| e < start);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].0 <= end {
            start = start.min(self.ranges[last].0);
            end = end.max(self.ranges[last].1);
            last += 1;
        }

        self.ranges.splice(first..last, std::iter::once((start, end)));
    }

    /// Whether every byte of `range` is present
    pub fn contains(&self, range: Range<u64>) -> bool {
        if range.start >= range.end {
            return true;
        }
        self.covered_end(range.start)
            .is_some_and(|end| end >= range.end)
    }

    /// End of the contiguous run covering `offset`, if `offset` is present
    pub fn covered_end(&self, offset: u64) -> Option<u64> {
        let idx = self.ranges.partition_point(|&(_, e)| e <= offset);
        match self.ranges.get(idx) {
            Some(&(s, e)) if s <= offset => Some(e),
            _ => None,
        }
    }

    /// Total number of bytes covered
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(|(s, e)| e - s).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Highest covered byte offset (exclusive)
    pub fn max_end(&self) -> u64 {
        self.ranges.last().map_or(0, |&(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        self.ranges.iter().map(|&(s, e)| s..e)
    }
}

//! Play queue with a current-position cursor
//!
//! Pure data structure: it never talks to the engine. Mutations report
//! whether the current item changed so the session knows when to reload.

use crate::error::{PlaybackError, Result};
use crate::types::QueueItem;

/// What `PlayQueue::remove` did to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveEffect {
    /// Removed after the current item; cursor untouched
    AfterCurrent,

    /// Removed before the current item; cursor moved down by one
    BeforeCurrent,

    /// Removed the current item; the cursor now points at its successor,
    /// or is cleared if there is none
    Current { next: Option<usize> },

    /// Queue had no current item
    NoCurrent,
}

/// Ordered play queue
///
/// Invariant: `current` is `None` or a valid index into `items`.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    items: Vec<QueueItem>,
    current: Option<usize>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    /// Number of items after the current one (all items if none is current)
    pub fn remaining(&self) -> usize {
        match self.current {
            Some(i) => self.items.len() - i - 1,
            None => self.items.len(),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(PlaybackError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            })
        }
    }

    /// Replace the whole queue and point at `index`
    ///
    /// Out-of-range `index` leaves the queue untouched.
    pub fn replace(&mut self, items: Vec<QueueItem>, index: usize) -> Result<()> {
        if index >= items.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index,
                len: items.len(),
            });
        }
        self.items = items;
        self.current = Some(index);
        Ok(())
    }

    /// Insert right after the current item (at the front if none)
    ///
    /// Returns the insertion index.
    pub fn add_next(&mut self, item: QueueItem) -> usize {
        let at = self.current.map_or(0, |i| i + 1);
        self.items.insert(at, item);
        at
    }

    /// Append items at the tail
    pub fn enqueue(&mut self, items: impl IntoIterator<Item = QueueItem>) {
        self.items.extend(items);
    }

    /// Remove the item at `index`
    pub fn remove(&mut self, index: usize) -> Result<(QueueItem, RemoveEffect)> {
        self.check_index(index)?;
        let removed = self.items.remove(index);

        let effect = match self.current {
            None => RemoveEffect::NoCurrent,
            Some(current) if index > current => RemoveEffect::AfterCurrent,
            Some(current) if index < current => {
                self.current = Some(current - 1);
                RemoveEffect::BeforeCurrent
            }
            Some(_) => {
                // Successor slid into `index`
                let next = (index < self.items.len()).then_some(index);
                self.current = next;
                RemoveEffect::Current { next }
            }
        };

        Ok((removed, effect))
    }

    /// Point at `index`
    pub fn set_current(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.current = Some(index);
        Ok(())
    }

    /// Move to the next item, if any
    pub fn advance(&mut self) -> Option<usize> {
        let next = match self.current {
            Some(i) if i + 1 < self.items.len() => i + 1,
            Some(_) => return None,
            None if !self.items.is_empty() => 0,
            None => return None,
        };
        self.current = Some(next);
        Some(next)
    }

    /// Move to the previous item, if any
    pub fn retreat(&mut self) -> Option<usize> {
        match self.current {
            Some(i) if i > 0 => {
                self.current = Some(i - 1);
                Some(i - 1)
            }
            _ => None,
        }
    }

    /// Forget the cursor, keeping the items
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
    }
}

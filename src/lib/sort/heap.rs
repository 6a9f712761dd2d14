//! Binary min-heap of slot handles with an external-context comparator.
//!
//! The heap stores small integer slot indices, not the node data itself; a
//! comparator closure supplied with every operation resolves indices against
//! the caller's slot array. This keeps the heap valid when slot contents are
//! refilled in place and lets one heap type serve both merge paths. The
//! comparator is fallible because derived-key callbacks can fail; any
//! failure propagates out of the heap operation that triggered it.
//!
//! Duplicate entries are permitted. Ties are resolved consistently but
//! arbitrarily.

use crate::errors::Result;
use std::cmp::Ordering;

/// The handle type: an index into the caller's slot array.
pub type Slot = u16;

/// Binary min-heap of [`Slot`] handles.
pub struct SlotHeap {
    entries: Vec<Slot>,
}

impl SlotHeap {
    /// Creates an empty heap with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the heap holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The minimum entry, if any.
    #[must_use]
    pub fn peek(&self) -> Option<Slot> {
        self.entries.first().copied()
    }

    /// Inserts an entry.
    pub fn insert<F>(&mut self, slot: Slot, cmp: &mut F) -> Result<()>
    where
        F: FnMut(Slot, Slot) -> Result<Ordering>,
    {
        self.entries.push(slot);
        self.sift_up(self.entries.len() - 1, cmp)
    }

    /// Replaces the minimum entry with `slot` in a single sift-down.
    ///
    /// Replacing the top with the same handle after its slot was refilled is
    /// the merge loop's steady-state operation.
    pub fn replace_top<F>(&mut self, slot: Slot, cmp: &mut F) -> Result<()>
    where
        F: FnMut(Slot, Slot) -> Result<Ordering>,
    {
        debug_assert!(!self.entries.is_empty());
        self.entries[0] = slot;
        self.sift_down(0, cmp)
    }

    /// Removes and returns the minimum entry.
    pub fn extract_top<F>(&mut self, cmp: &mut F) -> Result<Option<Slot>>
    where
        F: FnMut(Slot, Slot) -> Result<Ordering>,
    {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let top = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0, cmp)?;
        }
        Ok(Some(top))
    }

    fn sift_up<F>(&mut self, mut idx: usize, cmp: &mut F) -> Result<()>
    where
        F: FnMut(Slot, Slot) -> Result<Ordering>,
    {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if cmp(self.entries[idx], self.entries[parent])? == Ordering::Less {
                self.entries.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn sift_down<F>(&mut self, mut idx: usize, cmp: &mut F) -> Result<()>
    where
        F: FnMut(Slot, Slot) -> Result<Ordering>,
    {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && cmp(self.entries[right], self.entries[left])? == Ordering::Less {
                child = right;
            }
            if cmp(self.entries[child], self.entries[idx])? == Ordering::Less {
                self.entries.swap(child, idx);
                idx = child;
            } else {
                break;
            }
        }
        Ok(())
    }
}

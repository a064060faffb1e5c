//! Join-point id allocation.
//!
//! Ids are dense non-negative integers. Freed ids are reused before the
//! high-water mark grows, lowest first. Reserving a specific id (as the
//! reader does for every persisted jpid) marks everything below it that is
//! not yet in use as free. Free ids are kept as half-open ranges, so a
//! single large reservation costs one entry.

use std::collections::BTreeMap;

use crate::error::CoreError;

/// Allocator state: the high-water mark plus the free ids below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpidAllocator {
    in_use: u32,
    /// Free ranges `start..end`, disjoint and never adjacent.
    freed: BTreeMap<u32, u32>,
}

impl JpidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an id that is not currently in use.
    pub fn alloc(&mut self) -> u32 {
        if let Some((start, end)) = self.freed.pop_first() {
            if start + 1 < end {
                self.freed.insert(start + 1, end);
            }
            return start;
        }
        let id = self.in_use;
        self.in_use += 1;
        id
    }

    /// Marks `id` as in use. Reserving an id that is already in use is a
    /// no-op. `u32::MAX` cannot be reserved.
    pub fn alloc_at(&mut self, id: u32) -> Result<(), CoreError> {
        if id < self.in_use {
            if let Some((start, end)) = self.free_range(id) {
                self.freed.remove(&start);
                if start < id {
                    self.freed.insert(start, id);
                }
                if id + 1 < end {
                    self.freed.insert(id + 1, end);
                }
            }
            return Ok(());
        }
        let next = id
            .checked_add(1)
            .ok_or(CoreError::JpidOutOfRange { jpid: id })?;
        if self.in_use < id {
            self.insert_free(self.in_use, id);
        }
        self.in_use = next;
        Ok(())
    }

    /// Returns `id` to the pool.
    pub fn free(&mut self, id: u32) {
        if !self.is_used(id) {
            return;
        }
        self.insert_free(id, id + 1);
        if let Some((&start, &end)) = self.freed.last_key_value() {
            if end == self.in_use {
                self.freed.remove(&start);
                self.in_use = start;
            }
        }
    }

    /// True if `id` is currently handed out.
    pub fn is_used(&self, id: u32) -> bool {
        id < self.in_use && self.free_range(id).is_none()
    }

    /// One past the highest id ever in use.
    pub fn high_water(&self) -> u32 {
        self.in_use
    }

    pub fn reset(&mut self) {
        self.in_use = 0;
        self.freed.clear();
    }

    /// The free range containing `id`, if any.
    fn free_range(&self, id: u32) -> Option<(u32, u32)> {
        self.freed
            .range(..=id)
            .next_back()
            .filter(|(_, &end)| id < end)
            .map(|(&start, &end)| (start, end))
    }

    /// Adds `start..end` (not overlapping any free range), joining it with
    /// the ranges directly before and after.
    fn insert_free(&mut self, mut start: u32, mut end: u32) {
        if let Some((&prev, &prev_end)) = self.freed.range(..start).next_back() {
            if prev_end == start {
                self.freed.remove(&prev);
                start = prev;
            }
        }
        if let Some(next_end) = self.freed.remove(&end) {
            end = next_end;
        }
        self.freed.insert(start, end);
    }
}

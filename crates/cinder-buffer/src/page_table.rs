//! Page table mapping resident pages to their frames.

use crate::frame::FrameId;
use cinder_common::page::PageId;
use cinder_common::{CinderError, Result};

/// Sentinel value for empty key slots.
const EMPTY_KEY: u64 = u64::MAX;

/// Sentinel value for deleted key slots (tombstone).
const TOMBSTONE_KEY: u64 = u64::MAX - 1;

/// Page table mapping PageId to FrameId.
///
/// Open-addressing hash table with linear probing and tombstones, sized to
/// 2x the pool capacity for a ~50% load factor. Holds at most one entry per
/// resident page: entries are added on miss-fill and removed on eviction,
/// flush, or disposal, so occupancy never exceeds the frame count.
pub struct PageTable {
    /// Keys (packed 64-bit PageId).
    keys: Box<[u64]>,
    /// Values (frame number per key slot).
    frames: Box<[u32]>,
    /// Bitmask for table indexing (table size - 1).
    mask: usize,
}

impl PageTable {
    /// Creates a page table sized for the given number of frames.
    pub fn new(capacity: usize) -> Self {
        let size = (capacity * 2).next_power_of_two().max(64);

        Self {
            keys: vec![EMPTY_KEY; size].into_boxed_slice(),
            frames: vec![FrameId::INVALID.0; size].into_boxed_slice(),
            mask: size - 1,
        }
    }

    /// Computes the probe start index for a key.
    #[inline(always)]
    fn index_of(&self, key: u64) -> usize {
        // FxHash-style multiply for distribution
        let hash = key.wrapping_mul(0x517cc1b727220a95);
        (hash as usize) & self.mask
    }

    /// Looks up a page and returns its frame if resident.
    pub fn get(&self, page_id: PageId) -> Option<FrameId> {
        let key = page_id.as_u64();
        let mut idx = self.index_of(key);

        for _ in 0..self.keys.len() {
            let stored = self.keys[idx];
            if stored == EMPTY_KEY {
                return None;
            }
            if stored == key {
                return Some(FrameId(self.frames[idx]));
            }
            // Skip tombstones and continue probing
            idx = (idx + 1) & self.mask;
        }
        None
    }

    /// Registers a page-to-frame mapping.
    ///
    /// Fails if the page is already mapped; a resident page occupies exactly
    /// one frame.
    pub fn insert(&mut self, page_id: PageId, frame_id: FrameId) -> Result<()> {
        let key = page_id.as_u64();
        let mut idx = self.index_of(key);
        let mut reusable: Option<usize> = None;

        for _ in 0..self.keys.len() {
            let stored = self.keys[idx];
            if stored == key {
                return Err(CinderError::DuplicateMapping { page_id });
            }
            if stored == TOMBSTONE_KEY {
                if reusable.is_none() {
                    reusable = Some(idx);
                }
            } else if stored == EMPTY_KEY {
                let slot = reusable.unwrap_or(idx);
                self.keys[slot] = key;
                self.frames[slot] = frame_id.0;
                return Ok(());
            }
            idx = (idx + 1) & self.mask;
        }

        // Every slot probed and none empty: fall back to a tombstone. The
        // table holds at most one entry per frame and is sized to twice the
        // frame count, so a tombstone always exists here.
        match reusable {
            Some(slot) => {
                self.keys[slot] = key;
                self.frames[slot] = frame_id.0;
                Ok(())
            }
            None => Err(CinderError::DuplicateMapping { page_id }),
        }
    }

    /// Removes a page mapping, returning the frame it occupied.
    ///
    /// Fails if the page is not mapped.
    pub fn remove(&mut self, page_id: PageId) -> Result<FrameId> {
        let key = page_id.as_u64();
        let mut idx = self.index_of(key);

        for _ in 0..self.keys.len() {
            let stored = self.keys[idx];
            if stored == EMPTY_KEY {
                break;
            }
            if stored == key {
                let frame_id = FrameId(self.frames[idx]);
                self.keys[idx] = TOMBSTONE_KEY;
                self.frames[idx] = FrameId::INVALID.0;
                return Ok(frame_id);
            }
            idx = (idx + 1) & self.mask;
        }
        Err(CinderError::MappingNotFound { page_id })
    }

    /// Returns true if the page is mapped.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.get(page_id).is_some()
    }

    /// Returns the number of mapped pages.
    pub fn len(&self) -> usize {
        self.keys
            .iter()
            .filter(|&&key| key != EMPTY_KEY && key != TOMBSTONE_KEY)
            .count()
    }

    /// Returns true if no pages are mapped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut table = PageTable::new(16);
        let page_id = PageId::new(0, 42);

        table.insert(page_id, FrameId(7)).unwrap();

        assert_eq!(table.get(page_id), Some(FrameId(7)));
        assert!(table.contains(page_id));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let table = PageTable::new(16);
        assert_eq!(table.get(PageId::new(0, 1)), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let mut table = PageTable::new(16);
        let page_id = PageId::new(1, 5);

        table.insert(page_id, FrameId(0)).unwrap();
        let err = table.insert(page_id, FrameId(1)).unwrap_err();

        assert!(matches!(err, CinderError::DuplicateMapping { .. }));
        // The original mapping is untouched
        assert_eq!(table.get(page_id), Some(FrameId(0)));
    }

    #[test]
    fn test_remove() {
        let mut table = PageTable::new(16);
        let page_id = PageId::new(0, 42);

        table.insert(page_id, FrameId(7)).unwrap();
        assert_eq!(table.remove(page_id).unwrap(), FrameId(7));

        assert_eq!(table.get(page_id), None);
        assert!(!table.contains(page_id));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut table = PageTable::new(16);

        let err = table.remove(PageId::new(0, 9)).unwrap_err();
        assert!(matches!(err, CinderError::MappingNotFound { .. }));
    }

    #[test]
    fn test_reinsert_after_remove() {
        let mut table = PageTable::new(16);
        let page_id = PageId::new(2, 3);

        table.insert(page_id, FrameId(1)).unwrap();
        table.remove(page_id).unwrap();
        table.insert(page_id, FrameId(4)).unwrap();

        assert_eq!(table.get(page_id), Some(FrameId(4)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_probing_past_tombstones() {
        let mut table = PageTable::new(16);

        // Fill enough entries to force collisions in the probe chain
        for i in 0..16 {
            table.insert(PageId::new(0, i), FrameId(i)).unwrap();
        }
        for i in (0..16).step_by(2) {
            table.remove(PageId::new(0, i)).unwrap();
        }

        // Survivors stay reachable through the tombstoned slots
        for i in (1..16).step_by(2) {
            assert_eq!(table.get(PageId::new(0, i)), Some(FrameId(i)));
        }
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn test_distinct_files_are_distinct_keys() {
        let mut table = PageTable::new(16);

        table.insert(PageId::new(0, 1), FrameId(0)).unwrap();
        table.insert(PageId::new(1, 1), FrameId(1)).unwrap();

        assert_eq!(table.get(PageId::new(0, 1)), Some(FrameId(0)));
        assert_eq!(table.get(PageId::new(1, 1)), Some(FrameId(1)));
    }

    #[test]
    fn test_capacity_cycling() {
        let mut table = PageTable::new(4);

        // Cycle many pages through a small table, as eviction does
        for round in 0..20u32 {
            let page_id = PageId::new(0, round);
            table.insert(page_id, FrameId(round % 4)).unwrap();
            if round >= 4 {
                table.remove(PageId::new(0, round - 4)).unwrap();
            }
        }

        assert_eq!(table.len(), 4);
        for i in 16..20 {
            assert!(table.contains(PageId::new(0, i)));
        }
    }
}

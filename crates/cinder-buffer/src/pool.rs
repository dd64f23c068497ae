//! Buffer pool manager.

use crate::frame::{FrameDescriptor, FrameId};
use crate::page_table::PageTable;
use crate::replacer::{ClockSweep, SweepVerdict};
use crate::store::PageStore;
use cinder_common::config::StorageConfig;
use cinder_common::page::{PageId, PAGE_SIZE};
use cinder_common::{CinderError, Result};
use sysinfo::System;

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

impl From<&StorageConfig> for BufferPoolConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            num_frames: config.buffer_pool_frames,
        }
    }
}

/// Buffer pool manager.
///
/// Caches a bounded set of disk pages in fixed-size frames, multiplexing
/// many logical pages onto the pool's capacity with:
/// - Page ID to frame ID mapping (open-addressing page table)
/// - Clock (second-chance) replacement for eviction
/// - Pin counting to keep in-use pages resident
/// - Dirty tracking with write-back on eviction, flush, and teardown
///
/// The pool's control structures are single-threaded; callers sharing a
/// pool across threads serialize access externally, e.g. behind one mutex.
pub struct BufferPool {
    /// Configuration.
    config: BufferPoolConfig,
    /// Storage backend pages are read from and written back to.
    store: Box<dyn PageStore>,
    /// Frame descriptor table; each frame owns its page buffer.
    frames: Vec<FrameDescriptor>,
    /// Page ID to frame ID mapping.
    page_table: PageTable,
    /// Clock cursor for victim selection.
    sweep: ClockSweep,
}

impl BufferPool {
    /// Creates a new buffer pool over the given storage backend.
    pub fn new(config: BufferPoolConfig, store: Box<dyn PageStore>) -> Self {
        let num_frames = config.num_frames;

        let frames: Vec<_> = (0..num_frames)
            .map(|i| FrameDescriptor::new(FrameId(i as u32)))
            .collect();

        Self {
            config,
            store,
            frames,
            page_table: PageTable::new(num_frames),
            sweep: ClockSweep::new(num_frames),
        }
    }

    /// Creates a buffer pool sized to 25% of available system RAM.
    ///
    /// Queries the system for available memory and allocates 25% of it
    /// for the buffer pool. Minimum 1,000 frames to ensure useful caching
    /// even on low-memory systems.
    pub fn auto_sized(store: Box<dyn PageStore>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4; // 25% of available RAM
        let num_frames = (target_bytes / PAGE_SIZE).max(1_000);

        Self::new(BufferPoolConfig { num_frames }, store)
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of pages currently resident.
    pub fn page_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_valid()).count()
    }

    /// Checks if a page is resident in the pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(page_id)
    }

    /// Fetches a page, pinning it for the caller.
    ///
    /// On a hit the resident frame gains a pin and its reference bit is
    /// touched. On a miss a frame is claimed through the clock sweep
    /// (possibly evicting an unpinned page, with write-back if dirty) and
    /// the page is read from the backend.
    ///
    /// The returned borrow is the page handle: it is valid only while the
    /// caller holds the pin, and every fetch must be paired with exactly one
    /// [`unpin_page`](Self::unpin_page) carrying the modified flag.
    pub fn fetch_page(&mut self, page_id: PageId) -> Result<&mut [u8; PAGE_SIZE]> {
        let frame_id = match self.page_table.get(page_id) {
            Some(frame_id) => {
                self.frames[frame_id.0 as usize].pin();
                frame_id
            }
            None => {
                let frame_id = self.allocate_frame()?;
                let page = self.store.read_page(page_id)?;
                let frame = &mut self.frames[frame_id.0 as usize];
                frame.set(page_id);
                frame.data_mut().copy_from_slice(&page);
                self.page_table.insert(page_id, frame_id)?;
                frame_id
            }
        };

        Ok(self.frames[frame_id.0 as usize].data_mut())
    }

    /// Releases one pin on a page.
    ///
    /// `dirty` reports whether the holder modified the page; the flag is
    /// sticky and only write-back clears it. Releasing a page that is not
    /// resident is a no-op: callers may release pages that were never
    /// buffered here. Releasing a resident page whose pin count is already
    /// zero is a caller bug and fails with `PageNotPinned`.
    pub fn unpin_page(&mut self, page_id: PageId, dirty: bool) -> Result<()> {
        let Some(frame_id) = self.page_table.get(page_id) else {
            return Ok(());
        };

        let frame = &mut self.frames[frame_id.0 as usize];
        if frame.pin_count() == 0 {
            return Err(CinderError::PageNotPinned {
                page_id,
                frame: frame_id.0,
            });
        }
        frame.unpin();
        if dirty {
            frame.set_dirty(true);
        }
        Ok(())
    }

    /// Allocates a fresh page in the file and pins it in the pool.
    ///
    /// The backend assigns the page number and zero-initializes the page;
    /// the returned handle starts from those zero bytes. The same release
    /// contract as [`fetch_page`](Self::fetch_page) applies.
    pub fn new_page(&mut self, file_id: u32) -> Result<(PageId, &mut [u8; PAGE_SIZE])> {
        let page_id = self.store.allocate_page(file_id)?;
        let frame_id = self.allocate_frame()?;

        self.page_table.insert(page_id, frame_id)?;
        let frame = &mut self.frames[frame_id.0 as usize];
        frame.set(page_id);

        Ok((page_id, frame.data_mut()))
    }

    /// Evicts every resident page belonging to the file.
    ///
    /// Dirty frames are written back before their descriptors are cleared,
    /// and the file's mappings are removed, so nothing of the file remains
    /// in the pool. Fails with `PagePinned` if a consumer still holds one of
    /// its pages, and with `FrameCorrupted` if any visited frame violates
    /// the empty-frame invariant.
    pub fn flush_file(&mut self, file_id: u32) -> Result<()> {
        for idx in 0..self.frames.len() {
            self.frames[idx].check_integrity()?;

            let Some(page_id) = self.frames[idx].page_id() else {
                continue;
            };
            if page_id.file_id != file_id {
                continue;
            }
            if self.frames[idx].is_pinned() {
                return Err(CinderError::PagePinned {
                    file: self.store.filename(file_id),
                    page_id,
                    frame: idx as u32,
                });
            }
            if self.frames[idx].is_dirty() {
                self.store.write_page(page_id, self.frames[idx].data())?;
            }
            self.page_table.remove(page_id)?;
            self.frames[idx].clear();
        }
        Ok(())
    }

    /// Deletes a page from durable storage and drops it from the pool.
    ///
    /// If the page is resident its frame is cleared without pin checks or
    /// write-back: deletion supersedes both.
    pub fn delete_page(&mut self, page_id: PageId) -> Result<()> {
        self.store.delete_page(page_id)?;

        if self.page_table.contains(page_id) {
            let frame_id = self.page_table.remove(page_id)?;
            self.frames[frame_id.0 as usize].clear();
        }
        Ok(())
    }

    /// Writes every dirty frame back to the backend.
    ///
    /// Residency and pins are untouched; only the dirty flags are cleared.
    pub fn flush_all(&mut self) -> Result<()> {
        for idx in 0..self.frames.len() {
            let Some(page_id) = self.frames[idx].page_id() else {
                continue;
            };
            if self.frames[idx].is_dirty() {
                self.store.write_page(page_id, self.frames[idx].data())?;
                self.frames[idx].set_dirty(false);
            }
        }
        Ok(())
    }

    /// Produces a diagnostic snapshot of every frame plus the count of
    /// occupied frames. Read-only.
    pub fn snapshot(&self) -> PoolSnapshot {
        let frames: Vec<_> = self
            .frames
            .iter()
            .map(|f| FrameSnapshot {
                frame_id: f.frame_id(),
                valid: f.is_valid(),
                page_id: f.page_id(),
                pin_count: f.pin_count(),
                dirty: f.is_dirty(),
                ref_bit: f.ref_bit(),
            })
            .collect();
        let valid_frames = frames.iter().filter(|f| f.valid).count();

        PoolSnapshot {
            frames,
            valid_frames,
        }
    }

    /// Finds a frame to (re)use, evicting an unpinned resident page if
    /// every frame is occupied.
    ///
    /// Fails with `PoolExhausted` when the bounded sweep finds nothing:
    /// every frame pinned, or continually re-referenced. Reference bits
    /// cleared by a failed sweep stay cleared.
    fn allocate_frame(&mut self) -> Result<FrameId> {
        let verdict = self
            .sweep
            .select(&mut self.frames)
            .ok_or(CinderError::PoolExhausted)?;

        if let SweepVerdict::Evict(frame_id) = verdict {
            self.evict(frame_id)?;
        }
        Ok(verdict.frame_id())
    }

    /// Evicts the page resident in the given frame: write-back if dirty,
    /// then mapping removal and descriptor clear.
    fn evict(&mut self, frame_id: FrameId) -> Result<()> {
        let idx = frame_id.0 as usize;
        let Some(page_id) = self.frames[idx].page_id() else {
            // A resident frame always carries its page identity
            return Err(CinderError::FrameCorrupted {
                frame: frame_id.0,
                dirty: self.frames[idx].is_dirty(),
                ref_bit: self.frames[idx].ref_bit(),
            });
        };

        if self.frames[idx].is_dirty() {
            self.store.write_page(page_id, self.frames[idx].data())?;
        }
        self.page_table.remove(page_id)?;
        self.frames[idx].clear();
        Ok(())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // No modified page may be silently dropped at teardown. A destructor
        // cannot surface write errors; callers that need to observe them
        // flush explicitly first.
        let _ = self.flush_all();
    }
}

/// Diagnostic state of a single frame.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Frame identifier.
    pub frame_id: FrameId,
    /// Whether the frame holds a page.
    pub valid: bool,
    /// Identity of the resident page, if any.
    pub page_id: Option<PageId>,
    /// Outstanding pins.
    pub pin_count: u32,
    /// Whether the frame awaits write-back.
    pub dirty: bool,
    /// Clock reference bit.
    pub ref_bit: bool,
}

/// Diagnostic snapshot of the whole pool.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    /// Per-frame state, in frame order.
    pub frames: Vec<FrameSnapshot>,
    /// Number of frames currently holding a page.
    pub valid_frames: usize,
}

//! Disk manager for page-level file I/O.

use cinder_buffer::PageStore;
use cinder_common::config::StorageConfig;
use cinder_common::page::{PageId, PAGE_SIZE};
use cinder_common::{CinderError, Result};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Configuration for the disk manager.
#[derive(Debug, Clone)]
pub struct DiskManagerConfig {
    /// Base directory for data files.
    pub data_dir: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fsync_enabled: true,
        }
    }
}

impl From<&StorageConfig> for DiskManagerConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            fsync_enabled: config.fsync_enabled,
        }
    }
}

/// Manages reading and writing pages to disk files.
///
/// Each file_id maps to a separate data file. File 0 is typically the main
/// heap file, while higher file IDs are used for indexes. Deleted page
/// numbers are tracked per open handle and handed back out by allocation,
/// lowest first; the set is not persisted, so a reopened file allocates
/// from its end again.
pub struct DiskManager {
    /// Configuration.
    config: DiskManagerConfig,
    /// Open file handles keyed by file_id.
    files: Mutex<HashMap<u32, FileHandle>>,
}

/// Handle for an open data file.
struct FileHandle {
    /// The file handle.
    file: File,
    /// Path to the file.
    path: PathBuf,
    /// Number of pages the file extends over.
    num_pages: u32,
    /// Page numbers deleted and available for reuse.
    free_pages: BTreeSet<u32>,
}

impl FileHandle {
    /// Returns true if the page number is currently allocated.
    fn is_allocated(&self, page_num: u32) -> bool {
        page_num < self.num_pages && !self.free_pages.contains(&page_num)
    }
}

impl DiskManager {
    /// Creates a new disk manager.
    pub fn new(config: DiskManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            config,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Generates the file path for a given file ID.
    fn file_path(&self, file_id: u32) -> PathBuf {
        self.config.data_dir.join(format!("{:08}.dat", file_id))
    }

    /// Opens or creates a data file.
    fn open_file(&self, file_id: u32) -> Result<()> {
        let mut files = self.files.lock();

        if files.contains_key(&file_id) {
            return Ok(());
        }

        let path = self.file_path(file_id);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        files.insert(
            file_id,
            FileHandle {
                file,
                path,
                num_pages,
                free_pages: BTreeSet::new(),
            },
        );

        Ok(())
    }

    /// Reads a page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<[u8; PAGE_SIZE]> {
        self.open_file(page_id.file_id)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&page_id.file_id)
            .ok_or(CinderError::PageNotFound { page_id })?;

        if !handle.is_allocated(page_id.page_num) {
            return Err(CinderError::PageNotFound { page_id });
        }

        let offset = (page_id.page_num as u64) * (PAGE_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = [0u8; PAGE_SIZE];
        handle.file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Writes a page to disk.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        self.open_file(page_id.file_id)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&page_id.file_id)
            .ok_or(CinderError::PageNotFound { page_id })?;

        if !handle.is_allocated(page_id.page_num) {
            return Err(CinderError::PageNotFound { page_id });
        }

        let offset = (page_id.page_num as u64) * (PAGE_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(data)?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }

        Ok(())
    }

    /// Allocates a fresh page in the file, zero-filled on disk.
    ///
    /// The lowest previously deleted page number is reused when one exists;
    /// otherwise the file is extended by one page.
    pub fn allocate_page(&self, file_id: u32) -> Result<PageId> {
        self.open_file(file_id)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&file_id)
            .ok_or(CinderError::PageNotFound {
                page_id: PageId::new(file_id, 0),
            })?;

        let page_num = match handle.free_pages.pop_first() {
            Some(reused) => reused,
            None => {
                let fresh = handle.num_pages;
                handle.num_pages += 1;
                fresh
            }
        };

        let offset = (page_num as u64) * (PAGE_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(&[0u8; PAGE_SIZE])?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }

        Ok(PageId::new(file_id, page_num))
    }

    /// Deletes a page from the file, making its number available for reuse.
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        self.open_file(page_id.file_id)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&page_id.file_id)
            .ok_or(CinderError::PageNotFound { page_id })?;

        if !handle.is_allocated(page_id.page_num) {
            return Err(CinderError::PageNotFound { page_id });
        }

        handle.free_pages.insert(page_id.page_num);
        Ok(())
    }

    /// Returns a diagnostic name for the file.
    pub fn filename(&self, file_id: u32) -> String {
        self.file_path(file_id).display().to_string()
    }

    /// Returns the number of pages the file extends over.
    pub fn num_pages(&self, file_id: u32) -> Result<u32> {
        self.open_file(file_id)?;

        let files = self.files.lock();
        let handle = files.get(&file_id).ok_or(CinderError::PageNotFound {
            page_id: PageId::new(file_id, 0),
        })?;
        Ok(handle.num_pages)
    }
}

impl PageStore for DiskManager {
    fn read_page(&mut self, page_id: PageId) -> Result<[u8; PAGE_SIZE]> {
        DiskManager::read_page(self, page_id)
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        DiskManager::write_page(self, page_id, data)
    }

    fn allocate_page(&mut self, file_id: u32) -> Result<PageId> {
        DiskManager::allocate_page(self, file_id)
    }

    fn delete_page(&mut self, page_id: PageId) -> Result<()> {
        DiskManager::delete_page(self, page_id)
    }

    fn filename(&self, file_id: u32) -> String {
        DiskManager::filename(self, file_id)
    }
}

//! Configuration structures for Cinder.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for a Cinder instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for data files.
    pub data_dir: PathBuf,
    /// Buffer pool size in number of frames.
    pub buffer_pool_frames: usize,
    /// Enable fsync for durability.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            buffer_pool_frames: 8192, // 128 MB with 16 KB pages
            fsync_enabled: true,
        }
    }
}

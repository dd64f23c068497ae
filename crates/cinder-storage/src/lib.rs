//! Page-granular disk storage for Cinder.
//!
//! This crate provides the durable half of the page cache: a disk manager
//! that reads, writes, allocates, and deletes fixed-size pages in per-file
//! data files, usable as the buffer pool's storage backend.

mod disk;

pub use disk::{DiskManager, DiskManagerConfig};

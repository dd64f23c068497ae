//! Buffer pool management for Cinder.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable frame count
//! - Clock (second-chance) eviction policy with a bounded victim search
//! - Pin counting to keep in-use pages resident
//! - Dirty page tracking with write-back on eviction, flush, and teardown

mod frame;
mod page_table;
mod pool;
mod replacer;
mod store;

pub use frame::{FrameDescriptor, FrameId};
pub use page_table::PageTable;
pub use pool::{BufferPool, BufferPoolConfig, FrameSnapshot, PoolSnapshot};
pub use replacer::{ClockSweep, SweepVerdict};
pub use store::PageStore;

// Export public modules
pub mod common;
pub mod storage;

// Re-export key items for convenient access
pub use storage::buffer::BufferPoolManager;
pub use storage::buffer::BufferPoolError;
pub use storage::buffer::{PageGuard, PageReadGuard, PageWriteGuard};
pub use storage::buffer::{AccessType, LruKReplacer};
pub use storage::disk::DiskManager;
pub use storage::wal::LogManager;

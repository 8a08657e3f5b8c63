use std::sync::Arc;
use parking_lot::RwLock;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page ID type
pub type PageId = u32;

/// Buffer pool frame ID type
pub type FrameId = u32;

/// LSN (Log Sequence Number) type
pub type Lsn = u64;

/// Page structure
///
/// A fixed-size block of bytes plus the LSN of the last log record that
/// touched it. The buffer pool reads the LSN before writing a dirty page
/// back so the write-ahead rule holds.
#[derive(Debug, Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    pub lsn: Lsn,
}

impl Page {
    pub fn new() -> Self {
        Self {
            data: [0; PAGE_SIZE],
            lsn: 0,
        }
    }

    /// Zero the payload and reset the LSN
    pub fn reset(&mut self) {
        self.data.fill(0);
        self.lsn = 0;
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

/// Smart pointer to a page; the RwLock is the frame's rw latch
pub type PagePtr = Arc<RwLock<Page>>;

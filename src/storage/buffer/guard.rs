use std::ops::{Deref, DerefMut};

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::types::{Page, PageId, PagePtr};
use crate::storage::buffer::manager::BufferPoolManager;

type ReadLatch = ArcRwLockReadGuard<RawRwLock, Page>;
type WriteLatch = ArcRwLockWriteGuard<RawRwLock, Page>;

/// Owning handle for one pin on a buffered page
///
/// Dropping the guard unpins the page, passing along whether it was
/// written through this guard. Access to the payload takes the page's
/// rw latch for the duration of the borrow only; use `PageReadGuard` or
/// `PageWriteGuard` to hold the latch across the guard's lifetime.
pub struct PageGuard<'a> {
    pool: &'a BufferPoolManager,
    page: PagePtr,
    page_id: PageId,
    is_dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPoolManager, page: PagePtr, page_id: PageId) -> Self {
        Self {
            pool,
            page,
            page_id,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Read access to the page payload
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Write access to the page payload; marks the guard dirty
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.is_dirty = true;
        self.page.write()
    }

    /// Record that the page was modified without borrowing the payload
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    fn latch_ptr(&self) -> &PagePtr {
        &self.page
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.unpin_page(self.page_id, self.is_dirty) {
            log::warn!("unpin of page {} on guard drop failed: {}", self.page_id, e);
        }
    }
}

impl std::fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("page_id", &self.page_id)
            .field("is_dirty", &self.is_dirty)
            .finish()
    }
}

/// A pinned page with its read latch held
///
/// Field order matters: the latch is declared first so it is released
/// before the inner guard's drop returns the pin. An evictor that wins
/// the freed pin can therefore never observe a still-latched frame.
pub struct PageReadGuard<'a> {
    latch: ReadLatch,
    guard: PageGuard<'a>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(guard: PageGuard<'a>) -> Self {
        let latch = guard.latch_ptr().read_arc();
        Self { latch, guard }
    }

    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        &self.latch
    }
}

impl std::fmt::Debug for PageReadGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageReadGuard")
            .field("page_id", &self.guard.page_id)
            .finish()
    }
}

/// A pinned page with its write latch held
///
/// Same latch-before-pin release order as `PageReadGuard`. Mutable
/// access marks the page dirty, so the write reaches disk on eviction
/// or flush.
pub struct PageWriteGuard<'a> {
    latch: WriteLatch,
    guard: PageGuard<'a>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(guard: PageGuard<'a>) -> Self {
        let latch = guard.latch_ptr().write_arc();
        Self { latch, guard }
    }

    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    pub fn mark_dirty(&mut self) {
        self.guard.mark_dirty();
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        &self.latch
    }
}

impl DerefMut for PageWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.mark_dirty();
        &mut self.latch
    }
}

impl std::fmt::Debug for PageWriteGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWriteGuard")
            .field("page_id", &self.guard.page_id)
            .field("is_dirty", &self.guard.is_dirty)
            .finish()
    }
}

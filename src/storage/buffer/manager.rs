use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use parking_lot::{Mutex, MutexGuard, RwLock};
use log::debug;

use crate::common::types::{FrameId, Page, PageId, PagePtr};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::guard::{PageGuard, PageReadGuard, PageWriteGuard};
use crate::storage::buffer::replacer::{AccessType, LruKReplacer};
use crate::storage::disk::DiskManager;
use crate::storage::wal::LogManager;

/// Bookkeeping for one frame. Lives under the pool latch; the page
/// payload itself lives behind the frame's rw latch.
#[derive(Debug, Default)]
struct FrameMeta {
    page_id: Option<PageId>,
    pin_count: u32,
    is_dirty: bool,
}

/// Everything the pool latch protects. The replacer sits in here too,
/// so it needs no lock of its own.
struct PoolInner {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: LruKReplacer,
    meta: Vec<FrameMeta>,
    next_page_id: PageId,
}

pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<PagePtr>,
    inner: Mutex<PoolInner>,
    disk_manager: Arc<DiskManager>,
    log_manager: Option<Arc<dyn LogManager>>,
}

impl BufferPoolManager {
    pub fn new(
        pool_size: usize,
        replacer_k: usize,
        db_path: impl AsRef<Path>,
    ) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        let mut meta = Vec::with_capacity(pool_size);

        for i in 0..pool_size {
            frames.push(Arc::new(RwLock::new(Page::new())));
            free_list.push_back(i as FrameId);
            meta.push(FrameMeta::default());
        }

        Ok(Self {
            pool_size,
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list,
                replacer: LruKReplacer::new(pool_size, replacer_k),
                meta,
                next_page_id: 0,
            }),
            disk_manager,
            log_manager: None,
        })
    }

    /// Create a new buffer pool manager with WAL support
    pub fn new_with_wal(
        pool_size: usize,
        replacer_k: usize,
        db_path: impl AsRef<Path>,
        log_manager: Arc<dyn LogManager>,
    ) -> Result<Self, BufferPoolError> {
        let mut pool = Self::new(pool_size, replacer_k, db_path)?;
        pool.log_manager = Some(log_manager);
        Ok(pool)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Fetch a page from the buffer pool or disk
    ///
    /// The returned page is pinned; the caller must hand the pin back via
    /// `unpin_page`, or use one of the guarded fetch variants instead.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        let mut inner = self.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            inner.meta[frame_id as usize].pin_count += 1;
            inner.replacer.record_access(frame_id, AccessType::Lookup);
            inner.replacer.set_evictable(frame_id, false);
            return Ok(Arc::clone(&self.frames[frame_id as usize]));
        }

        // Not resident: take a frame and read from disk.
        let (inner, frame_id) = self.acquire_frame(inner)?;
        let Some(frame_id) = frame_id else {
            return Err(BufferPoolError::BufferPoolFull);
        };
        let idx = frame_id as usize;
        drop(inner);

        // The frame is private here: unmapped, unpinned, reachable from
        // neither the free list nor the replacer.
        let read_result = {
            let mut page = self.frames[idx].write();
            self.disk_manager.read_page(page_id, &mut page)
        };
        if let Err(e) = read_result {
            self.inner.lock().free_list.push_back(frame_id);
            return Err(e.into());
        }

        let mut inner = self.inner.lock();
        if let Some(&winner) = inner.page_table.get(&page_id) {
            // Another thread loaded the same page while we were reading;
            // retire our frame and join theirs.
            debug!("page {} loaded twice, retiring frame {}", page_id, frame_id);
            inner.free_list.push_back(frame_id);
            inner.meta[winner as usize].pin_count += 1;
            inner.replacer.record_access(winner, AccessType::Lookup);
            inner.replacer.set_evictable(winner, false);
            return Ok(Arc::clone(&self.frames[winner as usize]));
        }

        let meta = &mut inner.meta[idx];
        meta.page_id = Some(page_id);
        meta.pin_count = 1;
        meta.is_dirty = false;
        inner.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id, AccessType::Lookup);
        inner.replacer.set_evictable(frame_id, false);

        Ok(Arc::clone(&self.frames[idx]))
    }

    /// Create a new page
    ///
    /// The page id comes from a monotone counter and is never reused. The
    /// returned page is zeroed and pinned.
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let inner = self.inner.lock();
        let (mut inner, frame_id) = self.acquire_frame(inner)?;
        let Some(frame_id) = frame_id else {
            return Err(BufferPoolError::BufferPoolFull);
        };
        let idx = frame_id as usize;

        let page_id = inner.next_page_id;
        inner.next_page_id += 1;
        drop(inner);

        // Zero the payload while the frame is still private, then publish.
        self.frames[idx].write().reset();

        let mut inner = self.inner.lock();
        let meta = &mut inner.meta[idx];
        meta.page_id = Some(page_id);
        meta.pin_count = 1;
        meta.is_dirty = false;
        inner.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id, AccessType::Unknown);
        inner.replacer.set_evictable(frame_id, false);

        debug!("allocated page {} in frame {}", page_id, frame_id);
        Ok((Arc::clone(&self.frames[idx]), page_id))
    }

    /// Unpin a page, potentially marking it as dirty
    ///
    /// The dirty flag is sticky: `is_dirty = false` never clears it. When
    /// the pin count drops to zero the frame becomes an eviction
    /// candidate.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Err(BufferPoolError::PageNotFound(page_id));
        };
        let meta = &mut inner.meta[frame_id as usize];
        if meta.pin_count == 0 {
            return Err(BufferPoolError::PageNotPinned(page_id));
        }
        meta.pin_count -= 1;
        if is_dirty {
            meta.is_dirty = true;
        }
        if meta.pin_count == 0 {
            inner.replacer.set_evictable(frame_id, true);
        }
        Ok(())
    }

    /// Flush a specific page to disk
    ///
    /// Writes unconditionally and clears the dirty flag. The pin state is
    /// unchanged on return.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Err(BufferPoolError::PageNotFound(page_id));
        };
        let idx = frame_id as usize;

        // Reserve the frame across the I/O so it cannot be evicted, and
        // clear the dirty flag up front: writes landing after this point
        // re-dirty the page through their own unpin.
        inner.meta[idx].pin_count += 1;
        inner.replacer.set_evictable(frame_id, false);
        let was_dirty = inner.meta[idx].is_dirty;
        inner.meta[idx].is_dirty = false;
        drop(inner);

        let result = self.write_back(idx, page_id);

        let mut inner = self.inner.lock();
        let meta = &mut inner.meta[idx];
        meta.pin_count -= 1;
        if result.is_err() && was_dirty {
            meta.is_dirty = true;
        }
        if meta.pin_count == 0 {
            inner.replacer.set_evictable(frame_id, true);
        }
        result
    }

    /// Flush all pages in the buffer pool to disk
    ///
    /// Works over a snapshot of the page table; pages evicted or deleted
    /// mid-iteration are skipped.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let page_ids: Vec<PageId> = {
            let inner = self.inner.lock();
            inner.page_table.keys().copied().collect()
        };

        for page_id in page_ids {
            match self.flush_page(page_id) {
                Ok(()) | Err(BufferPoolError::PageNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Delete a page from the buffer pool
    ///
    /// Deleting a page that is not resident succeeds trivially. A pinned
    /// page cannot be deleted; callers must unpin it first.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(());
        };
        let idx = frame_id as usize;
        if inner.meta[idx].pin_count > 0 {
            return Err(BufferPoolError::PagePinned(page_id));
        }

        if inner.meta[idx].is_dirty {
            // Write back outside the latch, under a reservation pin.
            inner.meta[idx].pin_count = 1;
            inner.replacer.set_evictable(frame_id, false);
            inner.meta[idx].is_dirty = false;
            drop(inner);

            let result = self.write_back(idx, page_id);

            inner = self.inner.lock();
            inner.meta[idx].pin_count -= 1;
            if let Err(e) = result {
                inner.meta[idx].is_dirty = true;
                if inner.meta[idx].pin_count == 0 {
                    inner.replacer.set_evictable(frame_id, true);
                }
                return Err(e);
            }
            if inner.meta[idx].pin_count > 0 || inner.meta[idx].is_dirty {
                // Someone fetched the page during the write-back, and may
                // have re-dirtied it; the page is live again, refuse the
                // delete rather than drop the unflushed write.
                if inner.meta[idx].pin_count == 0 {
                    inner.replacer.set_evictable(frame_id, true);
                }
                return Err(BufferPoolError::PagePinned(page_id));
            }
        }

        inner.page_table.remove(&page_id);
        inner.replacer.set_evictable(frame_id, true);
        inner.replacer.remove(frame_id);
        inner.meta[idx] = FrameMeta::default();
        inner.free_list.push_back(frame_id);
        drop(inner);

        self.disk_manager.deallocate_page(page_id);
        debug!("deleted page {}, frame {} back on the free list", page_id, frame_id);
        Ok(())
    }

    /// Fetch a page wrapped in a guard that unpins on drop
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<PageGuard<'_>, BufferPoolError> {
        let page = self.fetch_page(page_id)?;
        Ok(PageGuard::new(self, page, page_id))
    }

    /// Fetch a page and hold its read latch for the guard's lifetime
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>, BufferPoolError> {
        let page = self.fetch_page(page_id)?;
        Ok(PageReadGuard::new(PageGuard::new(self, page, page_id)))
    }

    /// Fetch a page and hold its write latch for the guard's lifetime
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>, BufferPoolError> {
        let page = self.fetch_page(page_id)?;
        Ok(PageWriteGuard::new(PageGuard::new(self, page, page_id)))
    }

    /// Create a new page wrapped in a guard that unpins on drop
    pub fn new_page_guarded(&self) -> Result<(PageGuard<'_>, PageId), BufferPoolError> {
        let (page, page_id) = self.new_page()?;
        Ok((PageGuard::new(self, page, page_id), page_id))
    }

    /// Get a reference to the log manager, if available
    pub fn log_manager(&self) -> Option<Arc<dyn LogManager>> {
        self.log_manager.clone()
    }

    /// Get a reference to the disk manager
    pub fn disk_manager(&self) -> Arc<DiskManager> {
        self.disk_manager.clone()
    }

    /// Secure a frame for reuse: free list first, then eviction
    ///
    /// Returns with the pool latch held and the frame private (unmapped,
    /// unpinned, untracked). Dirty victims are written back with the
    /// latch released; if a concurrent fetch revives the victim during
    /// that window the loop picks a new one.
    fn acquire_frame<'a>(
        &'a self,
        mut inner: MutexGuard<'a, PoolInner>,
    ) -> Result<(MutexGuard<'a, PoolInner>, Option<FrameId>), BufferPoolError> {
        loop {
            if let Some(frame_id) = inner.free_list.pop_front() {
                return Ok((inner, Some(frame_id)));
            }

            let Some(frame_id) = inner.replacer.evict() else {
                return Ok((inner, None));
            };
            let idx = frame_id as usize;
            debug_assert_eq!(inner.meta[idx].pin_count, 0, "evicted a pinned frame");

            if inner.meta[idx].is_dirty {
                // Keep the victim mapped and pinned while its contents go
                // to disk, so concurrent fetches of the old page hit
                // memory instead of racing the write.
                let old_page_id = inner.meta[idx]
                    .page_id
                    .expect("dirty frame with no resident page");
                inner.meta[idx].pin_count = 1;
                inner.meta[idx].is_dirty = false;
                drop(inner);

                debug!("evicting dirty page {} from frame {}", old_page_id, frame_id);
                let result = self.write_back(idx, old_page_id);

                inner = self.inner.lock();
                inner.meta[idx].pin_count -= 1;
                if let Err(e) = result {
                    inner.meta[idx].is_dirty = true;
                    if inner.meta[idx].pin_count == 0 {
                        // evict() dropped the node; restore enough history
                        // for the frame to stay an eviction candidate.
                        inner.replacer.record_access(frame_id, AccessType::Unknown);
                        inner.replacer.set_evictable(frame_id, true);
                    }
                    return Err(e);
                }
                if inner.meta[idx].pin_count > 0 || inner.meta[idx].is_dirty {
                    // The old page was fetched (and possibly re-dirtied)
                    // while we were writing; leave it resident. If the
                    // reviver already unpinned, the node it re-created is
                    // still marked in-use and must become a candidate
                    // again.
                    if inner.meta[idx].pin_count == 0 {
                        inner.replacer.set_evictable(frame_id, true);
                    }
                    continue;
                }
            }

            if let Some(old_page_id) = inner.meta[idx].page_id.take() {
                inner.page_table.remove(&old_page_id);
            }
            // A fetch hit during the write-back window may have re-created
            // the replacer node; purge it so no stale history survives.
            inner.replacer.set_evictable(frame_id, true);
            inner.replacer.remove(frame_id);
            inner.meta[idx] = FrameMeta::default();
            return Ok((inner, Some(frame_id)));
        }
    }

    /// Write one frame's page to disk, honoring the WAL rule. Callers
    /// must hold a pin on the frame and must not hold the pool latch.
    fn write_back(&self, idx: usize, page_id: PageId) -> Result<(), BufferPoolError> {
        let page = self.frames[idx].read();
        if let Some(ref log_manager) = self.log_manager {
            log_manager.flush_till_lsn(page.lsn)?;
        }
        self.disk_manager.write_page(page_id, &page)?;
        Ok(())
    }
}

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use crate::storage::page::Page;
use crate::storage::pager::Pager;

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct GlobalPageId {
    pub file_id: u32,
    pub page_id: u32,
}

/// LRU page cache shared by every index handle. Fetching pins a page for
/// as long as the caller holds the returned Arc; marking dirty happens
/// through the page's write guard. Dirty pages are written out when the
/// LRU evicts them or on `flush_all`.
pub struct BufferPool {
    pages: Mutex<LruCache<GlobalPageId, Arc<RwLock<Page>>>>,
    pagers: Mutex<HashMap<u32, Arc<Pager>>>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        let c = NonZeroUsize::new(capacity).expect("Capacity must be > 0");
        Self {
            pages: Mutex::new(LruCache::new(c)),
            pagers: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_pager(&self, file_id: u32, pager: Arc<Pager>) {
        self.pagers.lock().insert(file_id, pager);
    }

    pub fn fetch_page(&self, global_id: GlobalPageId) -> Result<Arc<RwLock<Page>>> {
        let mut pages = self.pages.lock();

        if let Some(page) = pages.get(&global_id) {
            return Ok(page.clone());
        }

        // Load from disk
        let pagers = self.pagers.lock();
        let pager = pagers
            .get(&global_id.file_id)
            .ok_or(anyhow!("File not registered"))?;
        let page = pager.read_page(global_id.page_id)?;

        let page_ref = Arc::new(RwLock::new(page));

        if let Some((evicted_id, evicted_page)) = pages.push(global_id, page_ref.clone()) {
            let page_guard = evicted_page.read();
            if page_guard.dirty {
                if let Some(pager) = pagers.get(&evicted_id.file_id) {
                    pager.write_page(&page_guard)?;
                }
            }
        }

        Ok(page_ref)
    }

    /// Insert a fresh zeroed page at an id the caller allocated. The page
    /// starts dirty so it reaches disk even if never touched again.
    pub fn create_page(&self, global_id: GlobalPageId) -> Result<Arc<RwLock<Page>>> {
        let mut pages = self.pages.lock();
        let pagers = self.pagers.lock();
        if !pagers.contains_key(&global_id.file_id) {
            return Err(anyhow!("File not registered"));
        }

        let mut page = Page::new(global_id.page_id);
        page.dirty = true;

        let page_ref = Arc::new(RwLock::new(page));

        if let Some((evicted_id, evicted_page)) = pages.push(global_id, page_ref.clone()) {
            let page_guard = evicted_page.read();
            if page_guard.dirty {
                if let Some(pager) = pagers.get(&evicted_id.file_id) {
                    pager.write_page(&page_guard)?;
                }
            }
        }

        Ok(page_ref)
    }

    pub fn flush_all(&self) -> Result<()> {
        let pages = self.pages.lock();
        let pagers = self.pagers.lock();

        for (pid, page) in pages.iter() {
            let mut page_guard = page.write();
            if page_guard.dirty {
                if let Some(pager) = pagers.get(&pid.file_id) {
                    pager.write_page(&page_guard)?;
                    page_guard.dirty = false;
                }
            }
        }
        Ok(())
    }
}

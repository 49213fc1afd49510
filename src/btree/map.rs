//! The owning map collaborator: comparator, page loader, and the
//! hooks a page calls on removal.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::btree::file_store::{FileStore, InMemoryFileStore};
use crate::btree::page::Page;
use crate::btree::position::PagePos;
use crate::btree::store::{InMemoryStore, StoreContext};
use crate::btree::value_type::ValueType;
use crate::error::StoreResult;

pub trait MapContext<K: ValueType, V: ValueType> {
    fn compare(&self, a: &K, b: &K) -> Ordering;

    fn id(&self) -> u32;

    /// Resolve a position-only `PageReference` into an in-memory page,
    /// going through the store's cache first.
    fn read_page(&self, pos: PagePos) -> StoreResult<Rc<RefCell<Page<K, V>>>>;

    /// A page is gone: release its live bytes now if it already has a
    /// position, otherwise the caller must defer via
    /// `removed_in_memory`.
    fn remove_page(&self, pos: PagePos, memory: usize);

    /// Number of children a page exposes to the generic tree
    /// operations. Overridable so a map like an R-tree can hide a
    /// trailing auxiliary child;
    /// the default simply reports every child slot.
    fn child_page_count(&self, page: &Page<K, V>) -> usize {
        page.child_count()
    }
}

/// A single-table, natural-order map context, sufficient to exercise
/// and test the page core end to end.
pub struct SimpleMapContext<K: ValueType, V: ValueType> {
    id: u32,
    pub store: Rc<InMemoryStore<K, V>>,
    pub file: RefCell<InMemoryFileStore>,
}

impl<K: ValueType + Ord, V: ValueType> SimpleMapContext<K, V> {
    pub fn new(id: u32, compression_level: u8, assertions: bool) -> Self {
        Self {
            id,
            store: Rc::new(InMemoryStore::new(compression_level, assertions)),
            file: RefCell::new(InMemoryFileStore::new()),
        }
    }
}

impl<K: ValueType + Ord, V: ValueType> MapContext<K, V> for SimpleMapContext<K, V> {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn read_page(&self, pos: PagePos) -> StoreResult<Rc<RefCell<Page<K, V>>>> {
        if let Some(cached) = self.store.get_cached(pos) {
            return Ok(cached);
        }
        let max_pos = self.file.borrow().len();
        let page = Page::read(&mut *self.file.borrow_mut(), pos, self, 0, max_pos)?;
        let rc = Rc::new(RefCell::new(page));
        self.store.cache_page(pos, Rc::clone(&rc));
        Ok(rc)
    }

    fn remove_page(&self, _pos: PagePos, memory: usize) {
        self.store.deregister_unsaved_page(memory);
    }
}

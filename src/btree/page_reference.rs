//! `PageReference`: a tagged edge to a child page. Holds the child's on-disk position, an
//! optional in-memory handle, and its descendant entry count so the
//! parent never needs to resolve the child just to know `totalCount`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::btree::map::MapContext;
use crate::btree::page::Page;
use crate::btree::position::PagePos;
use crate::btree::value_type::ValueType;
use crate::error::StoreResult;

pub struct PageReference<K: ValueType, V: ValueType> {
    pub position: PagePos,
    pub page: Option<Rc<RefCell<Page<K, V>>>>,
    pub count: u64,
}

impl<K: ValueType, V: ValueType> Clone for PageReference<K, V> {
    fn clone(&self) -> Self {
        Self {
            position: self.position,
            page: self.page.clone(),
            count: self.count,
        }
    }
}

impl<K: ValueType, V: ValueType> PageReference<K, V> {
    /// A reference to a page that has not been written yet.
    pub fn unsaved(page: Rc<RefCell<Page<K, V>>>, count: u64) -> Self {
        let position = page.borrow().position();
        Self {
            position,
            page: Some(page),
            count,
        }
    }

    /// A weak, position-only reference.
    pub fn position_only(position: PagePos, count: u64) -> Self {
        Self {
            position,
            page: None,
            count,
        }
    }

    /// Resolve to an in-memory handle, loading through the map when
    /// this is currently a weak reference.
    pub fn resolve<M: MapContext<K, V>>(&self, map: &M) -> StoreResult<Rc<RefCell<Page<K, V>>>> {
        match &self.page {
            Some(p) => Ok(Rc::clone(p)),
            None => map.read_page(self.position),
        }
    }

    /// `setChild` is a no-op when the incoming child is identical by
    /// page identity and position.
    pub fn is_same_child(&self, other: &PageReference<K, V>) -> bool {
        let same_page = match (&self.page, &other.page) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_page && self.position == other.position
    }
}

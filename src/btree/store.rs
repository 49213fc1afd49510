//! The store collaborator: unsaved-page bookkeeping, the page cache
//! the write-out protocol populates, compressor access, and the
//! assertion toggle `recalculate_memory` and `total_count` checks run
//! under.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::btree::compressor::{Compressor, FastCompressor, HighCompressor};
use crate::btree::page::Page;
use crate::btree::position::PagePos;
use crate::btree::value_type::ValueType;
use crate::config::StoreConfig;

pub trait StoreContext<K: ValueType, V: ValueType> {
    /// A page was just created in memory and has no position yet;
    /// register its memory estimate as "unsaved".
    fn register_unsaved_page(&self, memory: usize);

    /// A page was removed while still unsaved, or a position-bearing
    /// page's live bytes should be released.
    fn deregister_unsaved_page(&self, memory: usize);

    /// Cache a freshly-positioned page under its position so later
    /// readers and the GC can find it without re-parsing bytes.
    /// Internal pages are cached twice, an LIRS-specific promotion
    /// hint this store is free to treat as a no-op.
    fn cache_page(&self, pos: PagePos, page: Rc<RefCell<Page<K, V>>>);

    fn get_cached(&self, pos: PagePos) -> Option<Rc<RefCell<Page<K, V>>>>;

    fn compressor_fast(&self) -> &dyn Compressor;
    fn compressor_high(&self) -> &dyn Compressor;

    /// 0 disables compression; nonzero selects fast vs. high per the
    /// caller's policy.
    fn compression_level(&self) -> u8;

    /// When set, `recalculate_memory` and `totalCount` recomputation
    /// are checked against the incrementally tracked values on every
    /// read.
    fn assertions_enabled(&self) -> bool;

    /// A chunk's live-byte accounting was told a leaf child occupies
    /// `max_length` bytes without the page ever being loaded.
    fn account_leaf_removed(&self, max_length: u32);

    /// A page that already had a position was removed; the store
    /// should reduce that chunk's live bytes by `memory`.
    fn page_removed(&self, pos: PagePos, memory: usize);
}

/// A concrete, process-local store: a plain `HashMap`-backed cache
/// (not LIRS) plus unsaved-byte and assertion bookkeeping.
pub struct InMemoryStore<K: ValueType, V: ValueType> {
    cache: RefCell<HashMap<PagePos, Rc<RefCell<Page<K, V>>>>>,
    unsaved_bytes: Cell<usize>,
    fast: FastCompressor,
    high: HighCompressor,
    compression_level: u8,
    assertions: bool,
}

impl<K: ValueType, V: ValueType> InMemoryStore<K, V> {
    pub fn new(compression_level: u8, assertions: bool) -> Self {
        Self::from_config(&StoreConfig {
            compression_level,
            assertions_enabled: assertions,
            ..StoreConfig::default()
        })
    }

    /// Build a store from the knobs a caller assembled into a
    /// `StoreConfig` (`min_page_size` is carried for callers that
    /// allocate fresh pages; the store itself only reads the
    /// compression and assertion fields).
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            cache: RefCell::new(HashMap::new()),
            unsaved_bytes: Cell::new(0),
            fast: FastCompressor,
            high: HighCompressor,
            compression_level: config.compression_level,
            assertions: config.assertions_enabled,
        }
    }

    pub fn unsaved_bytes(&self) -> usize {
        self.unsaved_bytes.get()
    }
}

impl<K: ValueType, V: ValueType> StoreContext<K, V> for InMemoryStore<K, V> {
    fn register_unsaved_page(&self, memory: usize) {
        self.unsaved_bytes.set(self.unsaved_bytes.get() + memory);
    }

    fn deregister_unsaved_page(&self, memory: usize) {
        self.unsaved_bytes
            .set(self.unsaved_bytes.get().saturating_sub(memory));
    }

    fn cache_page(&self, pos: PagePos, page: Rc<RefCell<Page<K, V>>>) {
        self.cache.borrow_mut().insert(pos, page);
    }

    fn get_cached(&self, pos: PagePos) -> Option<Rc<RefCell<Page<K, V>>>> {
        self.cache.borrow().get(&pos).cloned()
    }

    fn compressor_fast(&self) -> &dyn Compressor {
        &self.fast
    }

    fn compressor_high(&self) -> &dyn Compressor {
        &self.high
    }

    fn compression_level(&self) -> u8 {
        self.compression_level
    }

    fn assertions_enabled(&self) -> bool {
        self.assertions
    }

    fn account_leaf_removed(&self, _max_length: u32) {
        // The in-memory store keeps no chunk-level live-byte ledger of
        // its own; a `Chunk`-backed store would subtract here.
    }

    fn page_removed(&self, _pos: PagePos, _memory: usize) {
        // Same: a chunk-aware store would look up the chunk owning
        // `pos` and subtract `memory` from its live bytes.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::value_type::{Bytes, IntKey};
    use crate::config::StoreConfig;

    #[test]
    fn from_config_carries_compression_and_assertions() {
        let config = StoreConfig {
            compression_level: 2,
            assertions_enabled: true,
            ..StoreConfig::default()
        };
        let store = InMemoryStore::<IntKey, Bytes>::from_config(&config);
        assert_eq!(store.compression_level(), 2);
        assert!(store.assertions_enabled());
    }

    #[test]
    fn copy_registers_the_new_page_alongside_the_original() {
        let store = InMemoryStore::<IntKey, Bytes>::new(0, false);
        let page = Page::<IntKey, Bytes>::create_empty(1, 1, &store);
        let created = store.unsaved_bytes();
        assert!(created > 0);

        // copy() only flags the unsaved original for later chunk-level
        // accounting (see `Page::write`'s `removed_in_memory` check);
        // it never reverses the original's own registration. The new
        // page must still register its own estimate.
        let copied = page.copy(2, &store);
        assert_eq!(store.unsaved_bytes(), created + copied.memory());
    }
}

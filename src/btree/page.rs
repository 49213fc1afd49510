//! The B-tree page: simultaneously a tree node, a cache entry, and a
//! self-describing on-disk record. Leaf and internal pages share one
//! header; their bodies differ in whether they carry values or
//! children, which is why `PageBody` is an enum — a page only knows
//! its category once constructed, so two separate structs would force
//! every caller to match on a type tag anyway.
//!
//! `keys`/`values`/`children` are `Rc<Vec<_>>` rather than plain
//! `Vec<_>`: `copy()` shares the `Rc` (cheap, structural sharing), and
//! a mutator that finds itself the sole owner (`Rc::strong_count ==
//! 1`) can safely hand back a rebuilt array in place via
//! `Rc::make_mut` without allocating a *third* copy that nobody reads
//! — `Rc::make_mut` clones exactly when another `Page` (or a reader
//! that captured the old arrays before `copy`) still holds the `Rc`.
//! See `DESIGN.md` for why this was chosen over unconditionally
//! reallocating on every mutator regardless of sharing.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::convert::TryInto;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::btree::chunk::Chunk;
use crate::btree::codec::{page_check, try_compress};
use crate::btree::compressor::{Compressor, FastCompressor, HighCompressor};
use crate::btree::consts::{PAGE_BASE, PAGE_CHILD_OVERHEAD, TYPE_INTERNAL_BIT};
use crate::btree::file_store::FileStore;
use crate::btree::map::MapContext;
use crate::btree::page_reference::PageReference;
use crate::btree::position::{PageKind, PagePos, PAGE_LARGE, PAGE_LARGE_PREFETCH};
use crate::btree::store::StoreContext;
use crate::btree::value_type::ValueType;
use crate::btree::write_buffer::{get_var_int, get_var_long, WriteBuffer};
use crate::error::{StoreError, StoreResult};

const TYPE_COMPRESSED_BIT: u8 = 2;
const TYPE_HIGH_BIT: u8 = 4;

/// The part of a page that differs between leaves and internal nodes.
pub enum PageBody<K: ValueType, V: ValueType> {
    Leaf(Rc<Vec<V>>),
    Internal(Rc<Vec<PageReference<K, V>>>),
}

impl<K: ValueType, V: ValueType> Clone for PageBody<K, V> {
    fn clone(&self) -> Self {
        match self {
            PageBody::Leaf(v) => PageBody::Leaf(Rc::clone(v)),
            PageBody::Internal(c) => PageBody::Internal(Rc::clone(c)),
        }
    }
}

pub struct Page<K: ValueType, V: ValueType> {
    map_id: u32,
    version: u64,
    position: Cell<PagePos>,
    total_count: u64,
    cached_compare: Cell<i32>,
    memory: usize,
    removed_in_memory: Cell<bool>,
    keys: Rc<Vec<K>>,
    body: PageBody<K, V>,
}

impl<K: ValueType, V: ValueType> Page<K, V> {
    /// A fresh, empty leaf page — the root of a brand new tree.
    /// Registers its memory estimate with `store` before returning, so
    /// an owning store's unsaved-byte accounting sees it immediately.
    pub fn create_empty(map_id: u32, version: u64, store: &dyn StoreContext<K, V>) -> Self {
        let page = Page {
            map_id,
            version,
            position: Cell::new(PagePos::UNSAVED),
            total_count: 0,
            cached_compare: Cell::new(0),
            memory: PAGE_BASE,
            removed_in_memory: Cell::new(false),
            keys: Rc::new(Vec::new()),
            body: PageBody::Leaf(Rc::new(Vec::new())),
        };
        page.register_as_unsaved(store);
        page
    }

    pub fn new_leaf(
        map_id: u32,
        version: u64,
        keys: Vec<K>,
        values: Vec<V>,
        store: &dyn StoreContext<K, V>,
    ) -> Self {
        let mut page = Page {
            map_id,
            version,
            position: Cell::new(PagePos::UNSAVED),
            total_count: keys.len() as u64,
            cached_compare: Cell::new(0),
            memory: 0,
            removed_in_memory: Cell::new(false),
            keys: Rc::new(keys),
            body: PageBody::Leaf(Rc::new(values)),
        };
        page.memory = page.recalculate_memory();
        page.register_as_unsaved(store);
        page
    }

    pub fn new_internal(
        map_id: u32,
        version: u64,
        keys: Vec<K>,
        children: Vec<PageReference<K, V>>,
        store: &dyn StoreContext<K, V>,
    ) -> Self {
        let total_count = children.iter().map(|c| c.count).sum();
        let mut page = Page {
            map_id,
            version,
            position: Cell::new(PagePos::UNSAVED),
            total_count,
            cached_compare: Cell::new(0),
            memory: 0,
            removed_in_memory: Cell::new(false),
            keys: Rc::new(keys),
            body: PageBody::Internal(Rc::new(children)),
        };
        page.memory = page.recalculate_memory();
        page.register_as_unsaved(store);
        page
    }

    pub fn map_id(&self) -> u32 {
        self.map_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn position(&self) -> PagePos {
        self.position.get()
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn memory(&self) -> usize {
        self.memory
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, PageBody::Leaf(_))
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn values(&self) -> Option<&[V]> {
        match &self.body {
            PageBody::Leaf(v) => Some(v),
            PageBody::Internal(_) => None,
        }
    }

    pub fn children(&self) -> Option<&[PageReference<K, V>]> {
        match &self.body {
            PageBody::Leaf(_) => None,
            PageBody::Internal(c) => Some(c),
        }
    }

    pub fn body(&self) -> &PageBody<K, V> {
        &self.body
    }

    /// The raw number of child slots, before a map's
    /// `child_page_count` hook hides any auxiliary trailing child.
    pub fn child_count(&self) -> usize {
        match &self.body {
            PageBody::Leaf(_) => 0,
            PageBody::Internal(c) => c.len(),
        }
    }

    pub fn removed_in_memory(&self) -> bool {
        self.removed_in_memory.get()
    }

    // ---- cached binary search --------------------------------

    /// Returns the index if found, otherwise `-(insertionPoint + 1)`.
    pub fn binary_search<M: MapContext<K, V>>(&self, map: &M, key: &K) -> i32 {
        let len = self.keys.len() as i32;
        if len == 0 {
            self.cached_compare.set(0);
            return -1;
        }

        let mut low = 0i32;
        let mut high = len - 1;
        let cached = self.cached_compare.get();
        let mut x = if cached >= 1 && cached - 1 <= high {
            cached - 1
        } else {
            high / 2
        };

        loop {
            let cmp = map.compare(&self.keys[x as usize], key);
            match cmp {
                Ordering::Equal => {
                    self.cached_compare.set(x + 1);
                    return x;
                }
                Ordering::Less => low = x + 1,
                Ordering::Greater => high = x - 1,
            }
            if low > high {
                self.cached_compare.set(low);
                return -(low + 1);
            }
            x = (low + high) / 2;
        }
    }

    // ---- memory accounting -------------------------------------

    pub fn recalculate_memory(&self) -> usize {
        let mut mem = PAGE_BASE;
        for k in self.keys.iter() {
            mem += K::memory_of(k);
        }
        match &self.body {
            PageBody::Leaf(values) => {
                for v in values.iter() {
                    mem += V::memory_of(v);
                }
            }
            PageBody::Internal(children) => {
                mem += children.len() * PAGE_CHILD_OVERHEAD;
            }
        }
        mem
    }

    /// Verify the incrementally tracked `memory`/`total_count` against
    /// a from-scratch recomputation, raising `INTERNAL` on mismatch.
    /// Only called when the store's assertion toggle is on.
    pub fn assert_consistent(&self) -> StoreResult<()> {
        let recomputed = self.recalculate_memory();
        if recomputed != self.memory {
            return Err(StoreError::Internal(format!(
                "memory mismatch: tracked {}, recomputed {}",
                self.memory, recomputed
            )));
        }
        let expected_count = match &self.body {
            PageBody::Leaf(values) => values.len() as u64,
            PageBody::Internal(children) => children.iter().map(|c| c.count).sum(),
        };
        if expected_count != self.total_count {
            return Err(StoreError::Internal(format!(
                "total_count mismatch: tracked {}, recomputed {}",
                self.total_count, expected_count
            )));
        }
        Ok(())
    }

    pub fn register_as_unsaved(&self, store: &dyn StoreContext<K, V>) {
        store.register_unsaved_page(self.memory);
    }

    // ---- page removal -------------------------------------------------

    /// Called by the map when this page is removed from the tree.
    pub fn remove_page(&self, store: &dyn StoreContext<K, V>) {
        if !self.position.get().is_unsaved() {
            store.page_removed(self.position.get(), self.memory);
        } else {
            self.removed_in_memory.set(true);
        }
    }

    /// Walk a whole subtree being discarded, accounting for live
    /// bytes along the way without necessarily loading every child.
    pub fn remove_all_recursive<M: MapContext<K, V>>(
        &self,
        map: &M,
        store: &dyn StoreContext<K, V>,
    ) -> StoreResult<()> {
        if let PageBody::Internal(children) = &self.body {
            for child_ref in children.iter() {
                if let Some(child_page) = &child_ref.page {
                    child_page.borrow().remove_all_recursive(map, store)?;
                } else if child_ref.position.is_leaf() {
                    let max_length = child_ref.position.estimated_length().unwrap_or(0);
                    store.account_leaf_removed(max_length);
                } else {
                    let child_page = map.read_page(child_ref.position)?;
                    child_page.borrow().remove_all_recursive(map, store)?;
                }
            }
        }
        self.remove_page(store);
        Ok(())
    }

    // ---- copy-on-write -------------------------------------------

    /// `copy(newVersion)`: share the current arrays, release the
    /// original's live bytes, register the new page's own estimate.
    pub fn copy(&self, new_version: u64, store: &dyn StoreContext<K, V>) -> Page<K, V> {
        self.remove_page(store);
        let copied = Page {
            map_id: self.map_id,
            version: new_version,
            position: Cell::new(PagePos::UNSAVED),
            total_count: self.total_count,
            cached_compare: Cell::new(self.cached_compare.get()),
            memory: self.memory,
            removed_in_memory: Cell::new(false),
            keys: Rc::clone(&self.keys),
            body: self.body.clone(),
        };
        copied.register_as_unsaved(store);
        copied
    }

    pub fn set_key(&mut self, index: usize, key: K) {
        let old_mem = K::memory_of(&self.keys[index]);
        let new_mem = K::memory_of(&key);
        Rc::make_mut(&mut self.keys)[index] = key;
        self.memory = self.memory - old_mem + new_mem;
    }

    pub fn set_value(&mut self, index: usize, value: V) {
        if let PageBody::Leaf(values) = &mut self.body {
            let old_mem = V::memory_of(&values[index]);
            let new_mem = V::memory_of(&value);
            Rc::make_mut(values)[index] = value;
            self.memory = self.memory - old_mem + new_mem;
        }
    }

    /// No-op when the incoming child is identical by page identity
    /// and position.
    pub fn set_child(&mut self, index: usize, child: Rc<RefCell<Page<K, V>>>) {
        if let PageBody::Internal(children) = &mut self.body {
            let count = child.borrow().total_count;
            let new_ref = PageReference::unsaved(child, count);
            if children[index].is_same_child(&new_ref) {
                return;
            }
            let old_count = children[index].count;
            Rc::make_mut(children)[index] = new_ref;
            self.total_count = self.total_count - old_count + count;
        }
    }

    pub fn patch_child(&mut self, index: usize, pos: PagePos, count: u64) {
        if let PageBody::Internal(children) = &mut self.body {
            let c = Rc::make_mut(children);
            c[index].position = pos;
            c[index].count = count;
        }
    }

    /// Drop in-memory handles of children that now have an assigned
    /// position, retaining the position-only reference.
    pub fn drop_saved_child_handles(&mut self) {
        if let PageBody::Internal(children) = &mut self.body {
            let c = Rc::make_mut(children);
            for r in c.iter_mut() {
                if r.page.is_some() && !r.position.is_unsaved() {
                    r.page = None;
                }
            }
        }
    }

    // ---- insert ----------------------------------------------------

    pub fn insert_leaf(&mut self, index: usize, key: K, value: V) {
        let delta_mem = K::memory_of(&key) + V::memory_of(&value);

        let mut new_keys = Vec::with_capacity(self.keys.len() + 1);
        new_keys.extend_from_slice(&self.keys[..index]);
        new_keys.push(key);
        new_keys.extend_from_slice(&self.keys[index..]);
        self.keys = Rc::new(new_keys);

        if let PageBody::Leaf(values) = &mut self.body {
            let mut new_values = Vec::with_capacity(values.len() + 1);
            new_values.extend_from_slice(&values[..index]);
            new_values.push(value);
            new_values.extend_from_slice(&values[index..]);
            *values = Rc::new(new_values);
        }

        self.total_count += 1;
        self.memory += delta_mem;
    }

    /// Insert `key` at keys-index `index` with `child` becoming the
    /// child immediately to its right (children-index `index + 1`) —
    /// the shape produced when a split promotes a key and its new
    /// right sibling into the parent.
    pub fn insert_node(&mut self, index: usize, key: K, child: Rc<RefCell<Page<K, V>>>) {
        let count = child.borrow().total_count;
        let delta_mem = K::memory_of(&key) + PAGE_CHILD_OVERHEAD;

        let mut new_keys = Vec::with_capacity(self.keys.len() + 1);
        new_keys.extend_from_slice(&self.keys[..index]);
        new_keys.push(key);
        new_keys.extend_from_slice(&self.keys[index..]);
        self.keys = Rc::new(new_keys);

        if let PageBody::Internal(children) = &mut self.body {
            let at = index + 1;
            let mut new_children = Vec::with_capacity(children.len() + 1);
            new_children.extend_from_slice(&children[..at]);
            new_children.push(PageReference::unsaved(child, count));
            new_children.extend_from_slice(&children[at..]);
            *children = Rc::new(new_children);
        }

        self.total_count += count;
        self.memory += delta_mem;
    }

    // ---- remove ------------------------------------------------

    /// `remove(index)`: for leaves, `index` is the key/value slot; for
    /// internal pages, `index` is the child slot (the paired key is
    /// `index`, or `index - 1` when removing the last child).
    pub fn remove(&mut self, index: usize) {
        match &mut self.body {
            PageBody::Leaf(values) => {
                let removed_key_mem = K::memory_of(&self.keys[index]);
                let removed_val_mem = V::memory_of(&values[index]);

                let mut new_keys = self.keys[..index].to_vec();
                new_keys.extend_from_slice(&self.keys[index + 1..]);
                self.keys = Rc::new(new_keys);

                let mut new_values = values[..index].to_vec();
                new_values.extend_from_slice(&values[index + 1..]);
                *values = Rc::new(new_values);

                self.total_count -= 1;
                self.memory -= removed_key_mem + removed_val_mem;
            }
            PageBody::Internal(children) => {
                let key_index = if index == self.keys.len() {
                    index.saturating_sub(1)
                } else {
                    index
                };
                let removed_key_mem = K::memory_of(&self.keys[key_index]);
                let removed_child_count = children[index].count;

                let mut new_keys = self.keys[..key_index].to_vec();
                new_keys.extend_from_slice(&self.keys[key_index + 1..]);
                self.keys = Rc::new(new_keys);

                let mut new_children = children[..index].to_vec();
                new_children.extend_from_slice(&children[index + 1..]);
                *children = Rc::new(new_children);

                self.total_count -= removed_child_count;
                self.memory -= removed_key_mem + PAGE_CHILD_OVERHEAD;
            }
        }
    }

    // ---- split ---------------------------------------------------

    /// Destructive on `self` (the left page); the split key is
    /// `right.keys()[0]`, promoted by the caller into the parent. The
    /// new right page is registered with `store` the same way any
    /// other freshly created page is.
    pub fn split_leaf(&mut self, at: usize, store: &dyn StoreContext<K, V>) -> Page<K, V> {
        let values = match &self.body {
            PageBody::Leaf(v) => Rc::clone(v),
            PageBody::Internal(_) => panic!("split_leaf called on an internal page"),
        };

        let left_keys = self.keys[..at].to_vec();
        let right_keys = self.keys[at..].to_vec();
        let left_values = values[..at].to_vec();
        let right_values = values[at..].to_vec();

        self.keys = Rc::new(left_keys);
        self.body = PageBody::Leaf(Rc::new(left_values));
        self.total_count = self.keys.len() as u64;
        self.memory = self.recalculate_memory();

        Page::new_leaf(self.map_id, self.version, right_keys, right_values, store)
    }

    /// Returns `(promoted_key, right_page)`; `promoted_key` is
    /// `keys[at]`, present in neither side afterward. The new right
    /// page is registered with `store` the same way any other freshly
    /// created page is.
    pub fn split_internal(
        &mut self,
        at: usize,
        store: &dyn StoreContext<K, V>,
    ) -> (K, Page<K, V>) {
        let children = match &self.body {
            PageBody::Internal(c) => Rc::clone(c),
            PageBody::Leaf(_) => panic!("split_internal called on a leaf page"),
        };

        let promoted_key = self.keys[at].clone();
        let left_keys = self.keys[..at].to_vec();
        let right_keys = self.keys[at + 1..].to_vec();
        let left_children = children[..at + 1].to_vec();
        let right_children = children[at + 1..].to_vec();

        self.keys = Rc::new(left_keys);
        self.total_count = left_children.iter().map(|c| c.count).sum();
        self.body = PageBody::Internal(Rc::new(left_children));
        self.memory = self.recalculate_memory();

        let right = Page::new_internal(self.map_id, self.version, right_keys, right_children, store);
        (promoted_key, right)
    }

    // ---- binary codec: write ----------------------------------

    /// Serialize this page into `buf`, assigning its position from
    /// `chunk`'s id and the buffer's current write offset. Returns
    /// `(position, child_table_offset)`; `child_table_offset` is the
    /// byte offset, within `buf`, of the first child position — the
    /// patch point the two-phase write-out protocol rewrites once
    /// children are positioned.
    pub fn write(
        &self,
        buf: &mut WriteBuffer,
        chunk: &mut Chunk,
        store: &dyn StoreContext<K, V>,
    ) -> StoreResult<(PagePos, usize)> {
        if !self.position.get().is_unsaved() {
            return Err(StoreError::Internal(format!(
                "write called on a page that already has position {}",
                self.position.get().0
            )));
        }

        let start = buf.position();
        let page_length_at = start;
        buf.put_int(0);
        let check_at = buf.position();
        buf.put_short(0);
        buf.put_var_int(self.map_id as u64);
        buf.put_var_int(self.keys.len() as u64);

        let mut payload_buf = WriteBuffer::new();
        for k in self.keys.iter() {
            K::write(&mut payload_buf, k);
        }
        if let PageBody::Leaf(values) = &self.body {
            for v in values.iter() {
                V::write(&mut payload_buf, v);
            }
        }
        let payload = payload_buf.into_vec();

        let level = store.compression_level();
        let compressed = if level > 0 && !payload.is_empty() {
            let compressor: &dyn Compressor = if level >= 2 {
                store.compressor_high()
            } else {
                store.compressor_fast()
            };
            try_compress(&payload, compressor)
        } else {
            None
        };

        let mut type_byte = if self.is_leaf() { 0u8 } else { TYPE_INTERNAL_BIT };
        if compressed.is_some() {
            type_byte |= TYPE_COMPRESSED_BIT;
            if level >= 2 {
                type_byte |= TYPE_HIGH_BIT;
            }
        }
        buf.put_byte(type_byte);

        let child_table_offset = buf.position();
        if let PageBody::Internal(children) = &self.body {
            for child in children.iter() {
                buf.put_long(child.position.0 as i64);
            }
            for child in children.iter() {
                buf.put_var_long(child.count);
            }
        }

        match &compressed {
            Some((added_len, bytes)) => {
                buf.put_var_int(*added_len);
                buf.put_bytes(bytes);
            }
            None => buf.put_bytes(&payload),
        }

        let page_length = (buf.position() - start) as i32;
        buf.put_int_at(page_length_at, page_length);

        let check = page_check(chunk.id, start as u32, page_length);
        buf.put_short_at(check_at, check as i16);

        let kind = if self.is_leaf() {
            PageKind::Leaf
        } else {
            PageKind::Internal
        };
        let pos = PagePos::new(chunk.id, start as u32, page_length as u32, kind);
        self.position.set(pos);

        chunk.account_write(page_length as u64);
        trace!(
            "wrote page map={} leaf={} keys={} at {:?}",
            self.map_id,
            self.is_leaf(),
            self.keys.len(),
            pos.0
        );

        if self.removed_in_memory.get() {
            debug!("page at {:?} was removed before receiving a position", pos.0);
            store.page_removed(pos, self.memory);
        }

        Ok((pos, child_table_offset))
    }

    // ---- binary codec: read -----------------------------------------

    /// Parse a page out of `file` at `pos`. `file_base` is the byte
    /// offset the chunk starts at within `file`; `max_pos` bounds how
    /// far a read may reach.
    pub fn read<M: MapContext<K, V>>(
        file: &mut dyn FileStore,
        pos: PagePos,
        map: &M,
        file_base: u64,
        max_pos: u64,
    ) -> StoreResult<Page<K, V>> {
        let offset = file_base + pos.offset() as u64;
        let mut length = match pos.estimated_length() {
            Some(l) => l as u64,
            None => PAGE_LARGE_PREFETCH as u64,
        };
        length = length.min(max_pos.saturating_sub(offset));
        let mut bytes = file.read_fully(offset, length as usize)?;

        if pos.length_class() == PAGE_LARGE {
            if bytes.len() < 4 {
                return Err(StoreError::FileCorrupt(
                    "page too short to recover page_length".into(),
                ));
            }
            let page_length = i32::from_le_bytes(bytes[..4].try_into().unwrap());
            if page_length < 4 {
                return Err(StoreError::FileCorrupt(format!(
                    "invalid page length {page_length}"
                )));
            }
            let full_len = (page_length as u64).min(max_pos.saturating_sub(offset));
            bytes = file.read_fully(offset, full_len as usize)?;
        }

        let mut cursor: &[u8] = &bytes;
        if cursor.len() < 4 {
            return Err(StoreError::FileCorrupt("page too short".into()));
        }
        let page_length = i32::from_le_bytes(cursor[..4].try_into().unwrap());
        if page_length < 4 || page_length as usize > bytes.len() {
            return Err(StoreError::FileCorrupt(format!(
                "page length {page_length} out of bounds"
            )));
        }
        cursor = &cursor[4..];

        let check = i16::from_le_bytes(cursor[..2].try_into().unwrap());
        cursor = &cursor[2..];
        let expected_check = page_check(pos.chunk_id(), pos.offset(), page_length) as i16;
        if check != expected_check {
            warn!("checksum mismatch at {:?}", pos.0);
            return Err(StoreError::FileCorrupt("checksum mismatch".into()));
        }

        let map_id = get_var_int(&mut cursor) as u32;
        if map_id != map.id() {
            return Err(StoreError::FileCorrupt(format!(
                "map id mismatch: expected {}, got {map_id}",
                map.id()
            )));
        }

        let key_count = get_var_int(&mut cursor) as usize;
        let type_byte = cursor[0];
        cursor = &cursor[1..];
        let is_internal = type_byte & TYPE_INTERNAL_BIT != 0;
        let is_compressed = type_byte & TYPE_COMPRESSED_BIT != 0;
        let is_high = type_byte & TYPE_HIGH_BIT != 0;

        let mut child_positions = Vec::new();
        let mut child_counts = Vec::new();
        if is_internal {
            for _ in 0..=key_count {
                let raw = i64::from_le_bytes(cursor[..8].try_into().unwrap());
                cursor = &cursor[8..];
                child_positions.push(PagePos(raw as u64));
            }
            for _ in 0..=key_count {
                child_counts.push(get_var_long(&mut cursor));
            }
        }

        let payload: Vec<u8> = if is_compressed {
            let added_len = get_var_int(&mut cursor) as usize;
            let expanded_len = cursor.len() + added_len;
            let compressor: &dyn Compressor = if is_high {
                &HighCompressor
            } else {
                &FastCompressor
            };
            compressor.expand(cursor, expanded_len)?
        } else {
            cursor.to_vec()
        };

        let mut payload_cursor: &[u8] = &payload;
        let mut keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            keys.push(K::read(&mut payload_cursor));
        }

        let (body, total_count) = if is_internal {
            let children: Vec<PageReference<K, V>> = child_positions
                .into_iter()
                .zip(child_counts.into_iter())
                .map(|(p, c)| PageReference::position_only(p, c))
                .collect();
            let total = children.iter().map(|c| c.count).sum();
            (PageBody::Internal(Rc::new(children)), total)
        } else {
            let mut values = Vec::with_capacity(key_count);
            for _ in 0..key_count {
                values.push(V::read(&mut payload_cursor));
            }
            (PageBody::Leaf(Rc::new(values)), key_count as u64)
        };

        let mut page = Page {
            map_id,
            // The wire format carries no version; a page read back
            // from disk is not mid-mutation under any version, so 0
            // (never a real version number, which starts at 1) flags
            // "unknown/read" rather than claiming a specific version.
            version: 0,
            position: Cell::new(pos),
            total_count,
            cached_compare: Cell::new(0),
            memory: 0,
            removed_in_memory: Cell::new(false),
            keys: Rc::new(keys),
            body,
        };
        page.memory = page.recalculate_memory();
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::map::SimpleMapContext;
    use crate::btree::value_type::{Bytes, IntKey};

    fn map() -> SimpleMapContext<IntKey, Bytes> {
        SimpleMapContext::new(7, 0, true)
    }

    #[test]
    fn empty_leaf_round_trip() {
        let m = map();
        let page = Page::<IntKey, Bytes>::create_empty(7, 1, &*m.store);
        assert!(page.is_leaf());
        assert_eq!(page.total_count(), 0);

        let mut buf = WriteBuffer::new();
        let mut chunk = Chunk::new(1);
        let (pos, _) = page.write(&mut buf, &mut chunk, &*m.store).unwrap();

        let bytes = buf.into_vec();
        m.file.borrow_mut().append(&bytes).unwrap();
        let max_pos = m.file.borrow().len();
        let read_back = Page::<IntKey, Bytes>::read(
            &mut *m.file.borrow_mut(),
            pos,
            &m,
            0,
            max_pos,
        )
        .unwrap();

        assert!(read_back.is_leaf());
        assert_eq!(read_back.keys().len(), 0);
        assert_eq!(read_back.total_count(), 0);
    }

    #[test]
    fn leaf_insert_then_split() {
        let m = map();
        let mut page = Page::<IntKey, Bytes>::create_empty(7, 1, &*m.store);
        let data = [(10, "a"), (20, "b"), (30, "c"), (40, "d")];
        for (i, (k, v)) in data.iter().enumerate() {
            page.insert_leaf(i, IntKey(*k), Bytes(v.as_bytes().to_vec()));
        }
        assert_eq!(page.total_count(), 4);

        let right = page.split_leaf(2, &*m.store);
        assert_eq!(page_keys(&page)[..2], [10, 20]);
        assert_eq!(right.keys().iter().map(|k| k.0).collect::<Vec<_>>(), vec![30, 40]);
        assert_eq!(page.total_count(), 2);
        assert_eq!(right.total_count(), 2);
    }

    #[test]
    fn binary_search_matches_expected_indices() {
        let m = map();
        let mut page = Page::<IntKey, Bytes>::create_empty(7, 1, &*m.store);
        for (i, k) in [1, 3, 5, 7, 9].into_iter().enumerate() {
            page.insert_leaf(i, IntKey(k), Bytes(vec![]));
        }
        assert_eq!(page.binary_search(&m, &IntKey(5)), 2);
        assert_eq!(page.binary_search(&m, &IntKey(7)), 3);
        assert_eq!(page.binary_search(&m, &IntKey(4)), -3);
    }

    #[test]
    fn internal_split_promotes_middle_key() {
        let m = map();
        let children: Vec<PageReference<IntKey, Bytes>> = (0..4)
            .map(|_| PageReference::position_only(PagePos::new(1, 0, 10, PageKind::Leaf), 5))
            .collect();
        let mut page = Page::new_internal(
            7,
            1,
            vec![IntKey(10), IntKey(20), IntKey(30)],
            children,
            &*m.store,
        );
        let (promoted, right) = page.split_internal(1, &*m.store);
        assert_eq!(promoted, IntKey(20));
        assert_eq!(page.keys(), &[IntKey(10)]);
        assert_eq!(page.total_count(), 10);
        assert_eq!(right.keys(), &[IntKey(30)]);
        assert_eq!(right.total_count(), 10);
    }

    fn page_keys(page: &Page<IntKey, Bytes>) -> Vec<i64> {
        page.keys().iter().map(|k| k.0).collect()
    }
}

//! `PageChildren`: a GC-oriented projection of an internal page.
//! Holds only position data — no keys, no in-memory handles — so
//! the garbage collector can scan a whole chunk's worth of pages
//! cheaply.

use std::collections::HashSet;
use std::convert::TryInto;

use crate::btree::codec::page_check;
use crate::btree::consts::TYPE_INTERNAL_BIT;
use crate::btree::file_store::FileStore;
use crate::btree::position::{PagePos, PAGE_LARGE, PAGE_LARGE_PREFETCH};
use crate::btree::write_buffer::get_var_int;
use crate::error::{StoreError, StoreResult};

pub struct PageChildren {
    pub position: PagePos,
    pub children: Vec<PagePos>,
    /// Set once `remove_duplicate_chunk_references` has deduplicated
    /// leaf children against the owning page's chunk.
    pub chunk_list: bool,
}

impl PageChildren {
    pub fn new(position: PagePos, children: Vec<PagePos>) -> Self {
        Self {
            position,
            children,
            chunk_list: false,
        }
    }

    /// Drop any leaf child whose chunk id duplicates one already seen,
    /// seeded with the owning page's own chunk. Internal-page children
    /// are retained unconditionally since they may transitively
    /// reference other chunks. A result of exactly
    /// one entry collapses to empty — a single remaining reference
    /// carries no information the GC needs beyond "this chunk is
    /// referenced", which `collect_referenced_chunks` already confirms
    /// via `position`.
    pub fn remove_duplicate_chunk_references(&mut self) {
        let mut seen_chunks: HashSet<u32> = HashSet::new();
        seen_chunks.insert(self.position.chunk_id());

        let mut kept = Vec::with_capacity(self.children.len());
        for &child in &self.children {
            if child.is_leaf() {
                if seen_chunks.insert(child.chunk_id()) {
                    kept.push(child);
                }
                // else: duplicate leaf chunk reference, drop it.
            } else {
                kept.push(child);
            }
        }

        if kept.len() == 1 {
            kept.clear();
        }

        self.children = kept;
        self.chunk_list = true;
    }

    /// Union the owning chunk and every child's chunk into `chunks`.
    pub fn collect_referenced_chunks(&self, chunks: &mut HashSet<u32>) {
        chunks.insert(self.position.chunk_id());
        for &child in &self.children {
            chunks.insert(child.chunk_id());
        }
    }

    /// Obtain a `PageChildren` by scanning raw chunk bytes, parsing
    /// only the header and — for internal pages — the child-position
    /// table, so the GC can walk a chunk without loading full pages
    /// (keys, values, or the child-count table). Returns `Ok(None)`
    /// for a leaf, which has no children to report.
    pub fn read(
        file: &mut dyn FileStore,
        pos: PagePos,
        map_id: u32,
        file_base: u64,
        max_pos: u64,
    ) -> StoreResult<Option<PageChildren>> {
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
            return Err(StoreError::FileCorrupt("checksum mismatch".into()));
        }

        let read_map_id = get_var_int(&mut cursor) as u32;
        if read_map_id != map_id {
            return Err(StoreError::FileCorrupt(format!(
                "map id mismatch: expected {map_id}, got {read_map_id}"
            )));
        }

        let key_count = get_var_int(&mut cursor) as usize;
        let type_byte = cursor[0];
        cursor = &cursor[1..];

        if type_byte & TYPE_INTERNAL_BIT == 0 {
            return Ok(None);
        }

        let mut children = Vec::with_capacity(key_count + 1);
        for _ in 0..=key_count {
            let raw = i64::from_le_bytes(cursor[..8].try_into().unwrap());
            cursor = &cursor[8..];
            children.push(PagePos(raw as u64));
        }

        Ok(Some(PageChildren::new(pos, children)))
    }
}

//! An append-only file region holding many pages plus metadata.
//! Out of scope for the core's algorithms, but the write-out
//! protocol mutates a chunk's counters directly, so a concrete
//! struct is supplied.

#[derive(Default)]
pub struct Chunk {
    pub id: u32,
    pub max_len: u64,
    pub max_len_live: u64,
    pub page_count: u64,
    pub page_count_live: u64,
}

impl Chunk {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Called when a page is written into this chunk.
    pub fn account_write(&mut self, len: u64) {
        self.max_len += len;
        self.max_len_live += len;
        self.page_count += 1;
        self.page_count_live += 1;
    }

    /// Called when a previously-live page at this chunk is superseded
    /// or removed.
    pub fn account_remove(&mut self, len: u64) {
        self.max_len_live = self.max_len_live.saturating_sub(len);
        self.page_count_live = self.page_count_live.saturating_sub(1);
    }
}

//! The file-store collaborator: `readFully`/append over chunk bytes.
//! `InMemoryFileStore` gives hermetic unit tests an in-memory backing;
//! a real-filesystem-backed store (`DiskFileStore`) is exercised
//! separately in `tests/roundtrip_file.rs` via `tempfile`.

use crate::error::{StoreError, StoreResult};
use std::io::{Read, Seek, SeekFrom, Write};

pub trait FileStore {
    /// Read exactly `length` bytes starting at `pos`, clamped by the
    /// caller to the chunk's known extent.
    fn read_fully(&mut self, pos: u64, length: usize) -> StoreResult<Vec<u8>>;

    fn append(&mut self, bytes: &[u8]) -> StoreResult<u64>;

    fn len(&self) -> u64;
}

/// A `Vec<u8>`-backed store, used by the crate's own unit tests.
#[derive(Default)]
pub struct InMemoryFileStore {
    data: Vec<u8>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }
}

impl FileStore for InMemoryFileStore {
    fn read_fully(&mut self, pos: u64, length: usize) -> StoreResult<Vec<u8>> {
        let start = pos as usize;
        let end = start + length;
        if end > self.data.len() {
            return Err(StoreError::FileCorrupt(format!(
                "read past end of file: want [{start}, {end}), have {}",
                self.data.len()
            )));
        }
        Ok(self.data[start..end].to_vec())
    }

    fn append(&mut self, bytes: &[u8]) -> StoreResult<u64> {
        let pos = self.data.len() as u64;
        self.data.extend_from_slice(bytes);
        Ok(pos)
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A real-filesystem-backed store, for tests that want to prove the
/// codec survives an actual `seek`/`read`/`write` cycle.
pub struct DiskFileStore {
    file: std::fs::File,
}

impl DiskFileStore {
    pub fn new(file: std::fs::File) -> Self {
        Self { file }
    }
}

impl FileStore for DiskFileStore {
    fn read_fully(&mut self, pos: u64, length: usize) -> StoreResult<Vec<u8>> {
        self.file.seek(SeekFrom::Start(pos))?;
        let mut buf = vec![0u8; length];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&mut self, bytes: &[u8]) -> StoreResult<u64> {
        let pos = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(bytes)?;
        Ok(pos)
    }

    fn len(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }
}

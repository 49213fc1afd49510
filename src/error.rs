use thiserror::Error;

/// Errors raised by the page core. Both variants are fatal to the
/// current operation; neither is retried or recovered locally —
/// callers must abort the read/write and decide how to proceed (e.g.
/// marking a chunk bad).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Page length outside bounds, checksum mismatch, or map-id
    /// mismatch while reading a page back from a chunk.
    #[error("file corrupt: {0}")]
    FileCorrupt(String),

    /// An invariant the writer is responsible for maintaining has been
    /// violated (stale `totalCount`, memory accounting drift, a second
    /// `write` on an already-positioned page, an unpositioned child at
    /// `writeEnd`).
    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

//! The versioned, copy-on-write B-tree page core: the page itself,
//! its packed on-disk position, the binary codec, and the
//! collaborator traits (map/store/file/compressor) it is written
//! against.

pub mod chunk;
pub mod codec;
pub mod compressor;
pub mod consts;
pub mod file_store;
pub mod map;
pub mod page;
pub mod page_children;
pub mod page_reference;
pub mod position;
pub mod store;
pub mod value_type;
pub mod write;
pub mod write_buffer;

pub use chunk::Chunk;
pub use compressor::{Compressor, FastCompressor, HighCompressor};
pub use file_store::{DiskFileStore, FileStore, InMemoryFileStore};
pub use map::{MapContext, SimpleMapContext};
pub use page::{Page, PageBody};
pub use page_children::PageChildren;
pub use page_reference::PageReference;
pub use position::{PageKind, PagePos, PAGE_LARGE, PAGE_LARGE_PREFETCH};
pub use store::{InMemoryStore, StoreContext};
pub use value_type::{Bytes, IntKey, ValueType};
pub use write::{write_end, write_unsaved_recursive};
pub use write_buffer::WriteBuffer;

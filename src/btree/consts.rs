//! Fixed constants shared across the page core.

/// Fixed per-page overhead counted by `recalculate_memory`. Chosen
/// to match the rough object overhead a page of this shape would
/// carry (array headers, the header struct itself); exact value is
/// not load-bearing, only its use as a constant floor is.
pub const PAGE_BASE: usize = 128;

/// Memory cost attributed to each child slot of an internal page
/// beyond the key it is paired with.
pub const PAGE_CHILD_OVERHEAD: usize = 16;

/// Minimum payload size before compression is attempted at all.
pub const MIN_COMPRESS_LEN: usize = 16;

/// `checkValue` bit width: the three `checkValue` outputs are XOR'ed
/// and truncated to these bits.
pub const CHECK_BITS: u32 = 16;

/// Type-byte bit set on internal pages, clear on leaves. Shared
/// between `Page::write`/`Page::read` and `PageChildren::read`, which
/// parses only far enough into a page to tell the two apart.
pub const TYPE_INTERNAL_BIT: u8 = 1;

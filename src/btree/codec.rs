//! The framing primitives shared by `Page::write`/`Page::read`: the
//! XOR checksum and the compress-if-smaller decision. Kept separate
//! from `page.rs` so the framing rules can be tested without a
//! concrete key/value type.

use crate::btree::compressor::Compressor;
use crate::btree::consts::{CHECK_BITS, MIN_COMPRESS_LEN};
use crate::btree::write_buffer::var_int_len;

/// A fixed scrambling of `v` into a `CHECK_BITS`-wide value, the
/// building block `checkValue` XORs three times over. Not cryptographic — only cheap and good enough to catch
/// accidental single-byte corruption in the checksum region.
pub fn check_value(v: u64) -> u16 {
    let mixed = v
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .rotate_left(17)
        ^ v.wrapping_add(0xA24B_AED4);
    (mixed & ((1u64 << CHECK_BITS) - 1)) as u16
}

/// `checkValue(chunkId) XOR checkValue(offset) XOR checkValue(pageLength)`.
pub fn page_check(chunk_id: u32, offset: u32, page_length: i32) -> u16 {
    check_value(chunk_id as u64) ^ check_value(offset as u64) ^ check_value(page_length as u64)
}

/// Attempt compression of `payload` with `compressor`. Returns
/// `Some((added_len, compressed_bytes))` when compression is attempted
/// *and* pays for itself (`compressed_len + varintLen(expanded -
/// compressed) < expanded`); `None` when compression is skipped (too
/// small) or not worthwhile.
pub fn try_compress(payload: &[u8], compressor: &dyn Compressor) -> Option<(u64, Vec<u8>)> {
    if payload.len() <= MIN_COMPRESS_LEN {
        return None;
    }
    let compressed = compressor.compress(payload);
    let expanded = payload.len() as u64;
    let added = expanded - compressed.len() as u64;
    if compressed.len() as u64 + var_int_len(added) as u64 < expanded {
        Some((added, compressed))
    } else {
        None
    }
}

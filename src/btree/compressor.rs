//! The two compressor tiers a page's payload can be run through: a
//! cheap "fast" tier and a better-ratio "high" tier.

use flate2::write::DeflateEncoder;
use flate2::read::DeflateDecoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{StoreError, StoreResult};

/// `compress`/`expand` over whole buffers.
pub trait Compressor {
    /// Compress `src` into a freshly allocated buffer.
    fn compress(&self, src: &[u8]) -> Vec<u8>;

    /// Expand `src` (known to decompress to exactly `expanded_len`
    /// bytes) into a freshly allocated buffer. The page checksum
    /// covers only position and length, not payload bytes, so a
    /// corrupt-but-checksum-valid payload must surface here as
    /// `FileCorrupt` rather than panic.
    fn expand(&self, src: &[u8], expanded_len: usize) -> StoreResult<Vec<u8>>;
}

/// The "fast" tier: raw DEFLATE at a low compression level.
pub struct FastCompressor;

impl Compressor for FastCompressor {
    fn compress(&self, src: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(src).expect("in-memory write cannot fail");
        encoder.finish().expect("in-memory write cannot fail")
    }

    fn expand(&self, src: &[u8], expanded_len: usize) -> StoreResult<Vec<u8>> {
        let mut out = Vec::with_capacity(expanded_len);
        DeflateDecoder::new(src)
            .read_to_end(&mut out)
            .map_err(|e| StoreError::FileCorrupt(format!("deflate decode failed: {e}")))?;
        Ok(out)
    }
}

/// The "high" tier: zstd at a high compression level, for callers that
/// favor ratio over CPU time.
pub struct HighCompressor;

impl Compressor for HighCompressor {
    fn compress(&self, src: &[u8]) -> Vec<u8> {
        zstd::stream::encode_all(src, 19).expect("in-memory write cannot fail")
    }

    fn expand(&self, src: &[u8], expanded_len: usize) -> StoreResult<Vec<u8>> {
        let out = zstd::stream::decode_all(src)
            .map_err(|e| StoreError::FileCorrupt(format!("zstd decode failed: {e}")))?;
        if out.len() != expanded_len {
            return Err(StoreError::FileCorrupt(format!(
                "expanded length mismatch: expected {expanded_len}, got {}",
                out.len()
            )));
        }
        Ok(out)
    }
}

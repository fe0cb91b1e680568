//! Snappy compression for data chunks.
//!
//! The on-disk format pins a single compressor. Callers that store their
//! payloads compressed run them through here before framing, and the chunk
//! checksum then covers the compressed bytes. Nothing on disk records
//! whether a chunk is compressed - the caller knows from context (document
//! bodies are, B-tree nodes are not).
//!
//! **Design**:
//! - Raw snappy block format (no stream framing; chunks already carry length + checksum)
//! - Allocation is fallible, so hostile or oversized length headers surface `OutOfMemory`
//! - `SNAPPY_THRESHOLD` is advisory: callers skip compression below it

use snap::raw::{decompress_len, max_compress_len, Decoder, Encoder};

use crate::error::{Result, StrataError};

/// Payloads below this many bytes are not worth compressing. Callers use
/// this to decide between the compressed and plain write paths; the codec
/// itself never enforces it.
pub const SNAPPY_THRESHOLD: usize = 64;

/// Compression algorithm for data chunks. The format allows exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionKind {
    /// Raw snappy blocks (fast, byte-oriented, moderate ratio).
    #[default]
    Snappy,
}

/// Compress `data`, returning the compressed bytes.
pub fn compress(kind: CompressionKind, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Snappy => {
            let max = max_compress_len(data.len());
            if max == 0 {
                // snap signals an over-long input with a zero bound.
                return Err(StrataError::CompressionFailed(format!(
                    "{} byte input exceeds snappy limits",
                    data.len()
                )));
            }
            let mut out = Vec::new();
            out.try_reserve_exact(max)
                .map_err(|_| StrataError::OutOfMemory(max))?;
            out.resize(max, 0);
            let written = Encoder::new()
                .compress(data, &mut out)
                .map_err(|e| StrataError::CompressionFailed(e.to_string()))?;
            out.truncate(written);
            Ok(out)
        }
    }
}

/// Decompress `data`, returning the original bytes. The length header
/// inside `data` is untrusted: allocation failures are reported rather
/// than aborting, and any malformed stream is rejected as corrupt.
pub fn decompress(kind: CompressionKind, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Snappy => {
            let len = decompress_len(data).map_err(|e| StrataError::CorruptInput(e.to_string()))?;
            let mut out = Vec::new();
            out.try_reserve_exact(len)
                .map_err(|_| StrataError::OutOfMemory(len))?;
            out.resize(len, 0);
            let written = Decoder::new()
                .decompress(data, &mut out)
                .map_err(|e| StrataError::CorruptInput(e.to_string()))?;
            out.truncate(written);
            Ok(out)
        }
    }
}

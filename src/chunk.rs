//! Chunk prefix codec.
//!
//! Every record in a strata file is a chunk: a length and checksum
//! prefix followed by the payload. The two kinds carry different
//! prefixes:
//!
//! ```text
//! header chunk (always starts a block)
//! [0x01][length: u32 BE = payload_len + 4][checksum: u32 BE][payload]
//!
//! data chunk (starts wherever the cursor sits)
//! [length: u32 BE, bit 31 set][checksum: u32 BE][payload]
//! ```
//!
//! The header length includes a fixed +4 left over from a retired
//! trailing-hash field; the four bytes themselves are never on disk.
//! Bit 31 of a data chunk length is reserved and must be set; the low
//! 31 bits hold the checksummed payload length, which is the compressed
//! length when the payload is stored compressed.

use crate::block::HEADER_MARKER;
use crate::error::{Result, StrataError};

/// Flag bit carried in every data chunk length field.
pub const DATA_CHUNK_FLAG: u32 = 0x8000_0000;

/// Header length fields run 4 bytes long, a retired trailing hash kept
/// only as arithmetic for format compatibility.
pub const HEADER_LENGTH_PAD: u32 = 4;

/// Largest header payload accepted when decoding. Headers hold a small
/// fixed root set; anything bigger is damage.
pub const MAX_HEADER_SIZE: u32 = 64 * 1024;

/// Largest payload a data chunk length field can describe, since bit 31
/// belongs to the kind flag.
pub const MAX_DATA_SIZE: u32 = 0x7FFF_FFFF;

/// On-disk size of a data chunk prefix, before marker insertion.
pub const DATA_PREFIX_LEN: usize = 8;

/// On-disk size of a header chunk prefix, marker byte included.
pub const HEADER_PREFIX_LEN: usize = 9;

/// The two chunk kinds the format defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Block-aligned file header record.
    Header,
    /// Ordinary record.
    Data,
}

/// A decoded chunk prefix: true payload length and stored checksum,
/// with the kind flag and length pad already stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPrefix {
    pub payload_len: u32,
    pub checksum: u32,
}

/// Encodes a data chunk prefix. `payload_len` must leave bit 31 clear;
/// the flag is stamped on here and nowhere else.
pub fn encode_data_prefix(payload_len: u32, checksum: u32) -> [u8; DATA_PREFIX_LEN] {
    debug_assert_eq!(payload_len & DATA_CHUNK_FLAG, 0);
    let mut out = [0u8; DATA_PREFIX_LEN];
    out[0..4].copy_from_slice(&(payload_len | DATA_CHUNK_FLAG).to_be_bytes());
    out[4..8].copy_from_slice(&checksum.to_be_bytes());
    out
}

/// Encodes a header chunk prefix, marker byte included.
pub fn encode_header_prefix(payload_len: u32, checksum: u32) -> [u8; HEADER_PREFIX_LEN] {
    let mut out = [0u8; HEADER_PREFIX_LEN];
    out[0] = HEADER_MARKER;
    out[1..5].copy_from_slice(&(payload_len + HEADER_LENGTH_PAD).to_be_bytes());
    out[5..9].copy_from_slice(&checksum.to_be_bytes());
    out
}

/// Decodes a data chunk prefix read from `offset`. Rejects a clear
/// bit 31: that bit is reserved and always set by writers, so a clear
/// bit means the bytes are not a data chunk prefix at all.
pub fn decode_data_prefix(bytes: [u8; DATA_PREFIX_LEN], offset: u64) -> Result<ChunkPrefix> {
    let raw_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    if raw_len & DATA_CHUNK_FLAG == 0 {
        return Err(StrataError::CorruptChunk {
            offset,
            reason: format!("data chunk flag missing from length field {:#010x}", raw_len),
        });
    }
    Ok(ChunkPrefix {
        payload_len: raw_len & !DATA_CHUNK_FLAG,
        checksum: u32::from_be_bytes(bytes[4..8].try_into().unwrap()),
    })
}

/// Decodes the length and checksum of a header chunk prefix, the 8
/// bytes after the block marker, read from `offset`.
pub fn decode_header_prefix(bytes: [u8; DATA_PREFIX_LEN], offset: u64) -> Result<ChunkPrefix> {
    let raw_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    if raw_len < HEADER_LENGTH_PAD {
        return Err(StrataError::CorruptChunk {
            offset,
            reason: format!("header length field {} below the fixed pad", raw_len),
        });
    }
    let payload_len = raw_len - HEADER_LENGTH_PAD;
    if payload_len > MAX_HEADER_SIZE {
        return Err(StrataError::CorruptChunk {
            offset,
            reason: format!("header payload of {} bytes exceeds the cap", payload_len),
        });
    }
    Ok(ChunkPrefix {
        payload_len,
        checksum: u32::from_be_bytes(bytes[4..8].try_into().unwrap()),
    })
}

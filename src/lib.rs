//! # Strata - Append-Only Block-Framed Storage Format
//!
//! `strata-rs` is the physical layer of an append-only, block-structured
//! database file: logical byte buffers go in, a precise physical byte
//! layout comes out, and reads invert that layout losslessly at any
//! offset.
//!
//! - **Fixed 4KB blocks**, each opened by a one-byte marker
//! - **Two chunk kinds**: block-aligned headers and place-anywhere data chunks
//! - **Length + checksum framing** on every chunk (CRC32 or CRC32C, chosen per file)
//! - **Snappy compression** for data chunk payloads
//! - **Pluggable backends** through the [`FileOps`] trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata_rs::{ChunkKind, StrataFile};
//!
//! # fn main() -> strata_rs::Result<()> {
//! let mut file = StrataFile::create("db.strata")?;
//!
//! // Data chunks land at the cursor; keep (position, size) to link
//! // them from other chunks.
//! let (doc_pos, _size) = file.write_data_chunk(b"document body")?;
//!
//! // Headers are forced onto a block boundary.
//! let header_pos = file.write_header_chunk(b"root pointers")?;
//! file.sync()?;
//!
//! let body = file.read_data_chunk(doc_pos)?;
//! assert_eq!(body, b"document body");
//!
//! let (kind, roots) = file.read_chunk(header_pos)?;
//! assert_eq!(kind, ChunkKind::Header);
//! assert_eq!(roots, b"root pointers");
//! # Ok(())
//! # }
//! ```
//!
//! ## On-Disk Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ Block 0: first header                              │
//! │   [0x01][len+4: u32 BE][crc: u32 BE][payload...]   │
//! ├────────────────────────────────────────────────────┤
//! │ Blocks 1..k: data chunks, marker-interleaved       │
//! │   [0x00][len | bit31: u32 BE][crc: u32 BE][payload │
//! │   [0x00]...payload continues past each boundary... │
//! ├────────────────────────────────────────────────────┤
//! │ Block k: next header, always block-aligned         │
//! │   [0x01][len+4][crc][payload...]                   │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Every write appends; written chunks are never touched again. After a
//! crash, recovery scans backward one marker byte per block to find the
//! newest intact header, then truncates past it.
//!
//! Modules:
//!
//! - [`error`] - Error types for strata operations
//! - [`ops`] - Positioned I/O backend trait and the std file implementation
//! - [`block`] - Marker interleaving and the logical-to-physical length map
//! - [`chunk`] - Chunk prefix codec
//! - [`checksum`] - CRC32 / CRC32C payload checksums
//! - [`compression`] - Snappy adapter for data chunk payloads
//! - [`file`] - [`StrataFile`]: cursor state plus chunk reads and writes

pub mod block;
pub mod checksum;
pub mod chunk;
pub mod compression;
pub mod error;
pub mod file;
pub mod ops;

// Re-export commonly used types
pub use block::{
    align_to_next_block, physical_length, read_framed, write_framed, BLOCK_SIZE, DATA_MARKER,
    HEADER_MARKER,
};
pub use checksum::{checksum, verify, ChecksumMode};
pub use chunk::{
    ChunkKind, ChunkPrefix, DATA_CHUNK_FLAG, HEADER_LENGTH_PAD, MAX_DATA_SIZE, MAX_HEADER_SIZE,
};
pub use compression::{compress, decompress, CompressionKind, SNAPPY_THRESHOLD};
pub use error::{Result, StrataError};
pub use file::StrataFile;
pub use ops::{FileOps, StdFileOps};

/// Strata format version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

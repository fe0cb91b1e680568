//! Chunk reads and writes over an append-only strata file.
//!
//! [`StrataFile`] owns the write cursor and the checksum mode; every
//! chunk operation goes through it. Writing is two typed operations,
//! header and data, because the two kinds place differently: headers
//! are forced onto a block boundary, data chunks go wherever the
//! cursor sits. Reads take a physical position, validate the stored
//! checksum, and hand back an owned payload.
//!
//! A failed write leaves the cursor untouched and the bytes past it
//! suspect. Recovery means truncating back to the last good header,
//! which belongs to the layer above; nothing here retries.

use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::block::{
    align_to_next_block, physical_length, pread_exact, pwrite_all, read_framed, write_framed,
    BLOCK_SIZE, DATA_MARKER, HEADER_MARKER,
};
use crate::checksum::{checksum, ChecksumMode};
use crate::chunk::{
    decode_data_prefix, decode_header_prefix, encode_data_prefix, encode_header_prefix, ChunkKind,
    DATA_PREFIX_LEN, HEADER_PREFIX_LEN, MAX_DATA_SIZE, MAX_HEADER_SIZE,
};
use crate::compression::{compress, decompress, CompressionKind};
use crate::error::{Result, StrataError};
use crate::ops::{FileOps, StdFileOps};

/// Append-only strata file: one writer cursor, any number of stateless
/// readers.
pub struct StrataFile {
    ops: Box<dyn FileOps>,
    pos: u64,
    checksum_mode: ChecksumMode,
}

impl StrataFile {
    /// Create a new file with the default checksum mode, truncating any
    /// existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_mode(path, ChecksumMode::default())
    }

    /// Create a new file with an explicit checksum mode.
    pub fn create_with_mode<P: AsRef<Path>>(path: P, mode: ChecksumMode) -> Result<Self> {
        info!("Creating strata file at {:?}", path.as_ref());
        let ops = StdFileOps::create(path)?;
        Ok(StrataFile {
            ops: Box::new(ops),
            pos: 0,
            checksum_mode: mode,
        })
    }

    /// Open an existing file with the default checksum mode. The write
    /// cursor resumes at the current end of the file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_mode(path, ChecksumMode::default())
    }

    /// Open an existing file with an explicit checksum mode.
    pub fn open_with_mode<P: AsRef<Path>>(path: P, mode: ChecksumMode) -> Result<Self> {
        info!("Opening strata file at {:?}", path.as_ref());
        let ops = StdFileOps::open(path)?;
        let pos = ops.len()?;
        Ok(StrataFile {
            ops: Box::new(ops),
            pos,
            checksum_mode: mode,
        })
    }

    /// Wrap a custom backend. The write cursor starts at the backend's
    /// reported length.
    pub fn from_ops(ops: Box<dyn FileOps>, mode: ChecksumMode) -> Result<Self> {
        let pos = ops.len()?;
        Ok(StrataFile {
            ops,
            pos,
            checksum_mode: mode,
        })
    }

    /// Current write cursor. Equals the physical file length for a file
    /// with no failed writes.
    pub fn cursor(&self) -> u64 {
        self.pos
    }

    /// Checksum mode the file was opened with.
    pub fn checksum_mode(&self) -> ChecksumMode {
        self.checksum_mode
    }

    /// Flush written chunks to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.ops.sync()?;
        Ok(())
    }

    /// Writes a header chunk and returns its physical position.
    ///
    /// The cursor is rounded up to the next block boundary first; any
    /// bytes skipped over are dead file space, never reused. The 9-byte
    /// prefix sits flush at the boundary, so it needs no marker
    /// insertion of its own; the payload is framed as usual after it.
    pub fn write_header_chunk(&mut self, payload: &[u8]) -> Result<u64> {
        let len = header_len(payload)?;
        let start = align_to_next_block(self.pos);
        let sum = checksum(self.checksum_mode, payload);
        let prefix = encode_header_prefix(len, sum);

        pwrite_all(&*self.ops, &prefix, start)?;
        let body = write_framed(&*self.ops, payload, start + HEADER_PREFIX_LEN as u64)?;

        self.pos = start + HEADER_PREFIX_LEN as u64 + body;
        debug!("Wrote {} byte header chunk at {}", payload.len(), start);
        Ok(start)
    }

    /// Writes a data chunk at the current cursor and returns its
    /// physical position and its end-to-end size on disk, markers
    /// included. Callers persist that pair to reference the chunk from
    /// other chunks.
    pub fn write_data_chunk(&mut self, payload: &[u8]) -> Result<(u64, u64)> {
        let len = data_len(payload)?;
        let start = self.pos;
        let sum = checksum(self.checksum_mode, payload);
        let prefix = encode_data_prefix(len, sum);

        let mut end = start;
        end += write_framed(&*self.ops, &prefix, end)?;
        end += write_framed(&*self.ops, payload, end)?;

        self.pos = end;
        debug!(
            "Wrote {} byte data chunk at {} ({} bytes on disk)",
            payload.len(),
            start,
            end - start
        );
        Ok((start, end - start))
    }

    /// Compresses `payload` and writes it as a data chunk. The stored
    /// checksum covers the compressed bytes, so readers validate before
    /// inflating.
    pub fn write_compressed_data_chunk(&mut self, payload: &[u8]) -> Result<(u64, u64)> {
        let compressed = compress(CompressionKind::Snappy, payload).map_err(|e| match e {
            // A payload the compressor rejects surfaces under the same
            // code readers use for bytes that will not inflate.
            StrataError::CompressionFailed(reason) => StrataError::CorruptInput(reason),
            other => other,
        })?;
        self.write_data_chunk(&compressed)
    }

    /// Reads the data chunk at `pos` and returns its payload.
    pub fn read_data_chunk(&self, pos: u64) -> Result<Vec<u8>> {
        let prefix_bytes = read_framed(&*self.ops, pos, DATA_PREFIX_LEN)?;
        let prefix = decode_data_prefix(prefix_bytes.as_slice().try_into().unwrap(), pos)?;

        let body_pos = pos + physical_length(pos % BLOCK_SIZE as u64, DATA_PREFIX_LEN as u64);
        let payload = read_framed(&*self.ops, body_pos, prefix.payload_len as usize)?;

        self.verify_payload(&payload, prefix.checksum, pos)?;
        debug!("Read {} byte data chunk at {}", payload.len(), pos);
        Ok(payload)
    }

    /// Reads the data chunk at `pos` and decompresses its payload.
    pub fn read_compressed_data_chunk(&self, pos: u64) -> Result<Vec<u8>> {
        let compressed = self.read_data_chunk(pos)?;
        decompress(CompressionKind::Snappy, &compressed)
    }

    /// Reads the header chunk at `pos`, which must be block-aligned and
    /// marked as a header block.
    pub fn read_header_chunk(&self, pos: u64) -> Result<Vec<u8>> {
        if pos % BLOCK_SIZE as u64 != 0 {
            return Err(StrataError::CorruptChunk {
                offset: pos,
                reason: "header chunks start on block boundaries".to_string(),
            });
        }
        let mut marker = [0u8; 1];
        pread_exact(&*self.ops, &mut marker, pos)?;
        if marker[0] != HEADER_MARKER {
            return Err(StrataError::CorruptChunk {
                offset: pos,
                reason: format!("block marker {:#04x} does not open a header", marker[0]),
            });
        }

        // Framed reads skip the boundary byte on their own, so reading
        // the prefix from the boundary position strips the marker.
        let prefix_bytes = read_framed(&*self.ops, pos, DATA_PREFIX_LEN)?;
        let prefix = decode_header_prefix(prefix_bytes.as_slice().try_into().unwrap(), pos)?;

        let payload = read_framed(
            &*self.ops,
            pos + HEADER_PREFIX_LEN as u64,
            prefix.payload_len as usize,
        )?;

        self.verify_payload(&payload, prefix.checksum, pos)?;
        debug!("Read {} byte header chunk at {}", payload.len(), pos);
        Ok(payload)
    }

    /// Reads whichever chunk sits at `pos`, using the block marker to
    /// tell the kinds apart when `pos` is block-aligned. An unaligned
    /// `pos` can only hold a data chunk.
    pub fn read_chunk(&self, pos: u64) -> Result<(ChunkKind, Vec<u8>)> {
        if pos % BLOCK_SIZE as u64 == 0 {
            let mut marker = [0u8; 1];
            pread_exact(&*self.ops, &mut marker, pos)?;
            return match marker[0] {
                HEADER_MARKER => Ok((ChunkKind::Header, self.read_header_chunk(pos)?)),
                DATA_MARKER => Ok((ChunkKind::Data, self.read_data_chunk(pos)?)),
                byte => Err(StrataError::CorruptChunk {
                    offset: pos,
                    reason: format!("unknown block marker {:#04x}", byte),
                }),
            };
        }
        Ok((ChunkKind::Data, self.read_data_chunk(pos)?))
    }

    fn verify_payload(&self, payload: &[u8], stored: u32, offset: u64) -> Result<()> {
        let computed = checksum(self.checksum_mode, payload);
        if computed != stored {
            warn!(
                "Checksum mismatch at offset {}: stored {:#010x}, computed {:#010x}",
                offset, stored, computed
            );
            return Err(StrataError::ChecksumMismatch {
                offset,
                stored,
                computed,
            });
        }
        Ok(())
    }
}

fn header_len(payload: &[u8]) -> Result<u32> {
    if payload.len() as u64 > MAX_HEADER_SIZE as u64 {
        return Err(invalid_input(format!(
            "header payload of {} bytes exceeds the {} byte cap",
            payload.len(),
            MAX_HEADER_SIZE
        )));
    }
    Ok(payload.len() as u32)
}

fn data_len(payload: &[u8]) -> Result<u32> {
    if payload.len() as u64 > MAX_DATA_SIZE as u64 {
        return Err(invalid_input(format!(
            "data payload of {} bytes exceeds the {} byte chunk limit",
            payload.len(),
            MAX_DATA_SIZE
        )));
    }
    Ok(payload.len() as u32)
}

fn invalid_input(reason: String) -> StrataError {
    StrataError::Io(io::Error::new(io::ErrorKind::InvalidInput, reason))
}

//! Block framing for strata files.
//!
//! A strata file is a sequence of 4096-byte blocks. The first byte of
//! every block is a marker that tells a scanner what the block holds:
//!
//! ```text
//! offset:   0         4096      8192      12288
//!           |---------|---------|---------|------
//!           M.........M.........M.........M......
//!
//!           M = marker byte: 0x00 data continues, 0x01 a header begins
//! ```
//!
//! Writers hand this module a logical byte stream and it interleaves the
//! markers on the way to disk; readers get the markers stripped back out.
//! The layers above never see them. Costs one byte per block, and lets
//! recovery locate the latest header by peeking one byte per block while
//! scanning backward from the end of the file.

use std::io;

use crate::error::{Result, StrataError};
use crate::ops::FileOps;

/// Physical size of one block.
pub const BLOCK_SIZE: usize = 4096;

const BLOCK_SIZE_U64: u64 = BLOCK_SIZE as u64;

/// First byte of a block that continues the surrounding byte stream.
pub const DATA_MARKER: u8 = 0x00;

/// First byte of a block where a header chunk begins.
pub const HEADER_MARKER: u8 = 0x01;

/// Rounds `pos` up to the next block boundary. Already-aligned
/// positions stay put.
pub fn align_to_next_block(pos: u64) -> u64 {
    if pos % BLOCK_SIZE_U64 == 0 {
        pos
    } else {
        (pos / BLOCK_SIZE_U64 + 1) * BLOCK_SIZE_U64
    }
}

/// Maps a logical length to the physical length on disk.
///
/// A read that starts `offset_in_block` bytes past a block boundary and
/// wants `logical_len` bytes of payload must fetch one extra physical
/// byte for every boundary it crosses. An `offset_in_block` of zero
/// means the very first byte fetched is itself a marker. This must agree
/// exactly with the insertion done by [`write_framed`] for every
/// `(offset, length)` pair or reads desynchronize from writes.
pub fn physical_length(offset_in_block: u64, logical_len: u64) -> u64 {
    if logical_len == 0 {
        return 0;
    }
    let mut extra = 0;
    let mut offset = offset_in_block % BLOCK_SIZE_U64;
    if offset == 0 {
        extra += 1;
        offset = 1;
    }
    let first = BLOCK_SIZE_U64 - offset;
    if logical_len <= first {
        return logical_len + extra;
    }
    // Each block past the first holds one marker plus 4095 payload bytes.
    let rest = logical_len - first;
    logical_len + extra + rest.div_ceil(BLOCK_SIZE_U64 - 1)
}

/// Writes `buf` starting at physical position `pos`, inserting a
/// [`DATA_MARKER`] whenever the physical cursor lands on a block
/// boundary. Returns the number of physical bytes emitted, markers
/// included. Short writes from the backend are retried until the whole
/// buffer is down; the first backend error aborts the write.
pub fn write_framed(ops: &dyn FileOps, buf: &[u8], pos: u64) -> Result<u64> {
    let mut cursor = pos;
    let mut remaining = buf;
    while !remaining.is_empty() {
        let offset = (cursor % BLOCK_SIZE_U64) as usize;
        if offset == 0 {
            let n = ops.pwrite(&[DATA_MARKER], cursor)?;
            if n == 0 {
                return Err(write_zero());
            }
            cursor += 1;
            continue;
        }
        let take = (BLOCK_SIZE - offset).min(remaining.len());
        let n = ops.pwrite(&remaining[..take], cursor)?;
        if n == 0 {
            return Err(write_zero());
        }
        remaining = &remaining[n..];
        cursor += n as u64;
    }
    Ok(cursor - pos)
}

/// Reads `logical_len` payload bytes from physical position `pos`,
/// stripping the marker byte at every block boundary crossed. Consumes
/// exactly [`physical_length`] physical bytes; a file that ends inside
/// that span fails with `UnexpectedEof`. Marker values are not
/// inspected here, only skipped.
pub fn read_framed(ops: &dyn FileOps, pos: u64, logical_len: usize) -> Result<Vec<u8>> {
    let physical = physical_length(pos % BLOCK_SIZE_U64, logical_len as u64);
    let physical = usize::try_from(physical).map_err(|_| StrataError::OutOfMemory(usize::MAX))?;

    let mut raw = Vec::new();
    raw.try_reserve_exact(physical)
        .map_err(|_| StrataError::OutOfMemory(physical))?;
    raw.resize(physical, 0);
    pread_exact(ops, &mut raw, pos)?;

    let mut out = Vec::new();
    out.try_reserve_exact(logical_len)
        .map_err(|_| StrataError::OutOfMemory(logical_len))?;

    let mut offset = (pos % BLOCK_SIZE_U64) as usize;
    let mut idx = 0;
    while out.len() < logical_len {
        if offset == 0 {
            idx += 1;
            offset = 1;
            continue;
        }
        let span = (BLOCK_SIZE - offset).min(logical_len - out.len());
        out.extend_from_slice(&raw[idx..idx + span]);
        idx += span;
        offset = (offset + span) % BLOCK_SIZE;
    }
    debug_assert_eq!(idx, raw.len(), "marker stripping out of step with the length mapper");

    Ok(out)
}

/// Writes all of `buf` at `pos` with no marker insertion, retrying
/// short writes.
pub(crate) fn pwrite_all(ops: &dyn FileOps, buf: &[u8], mut pos: u64) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        let n = ops.pwrite(&buf[written..], pos)?;
        if n == 0 {
            return Err(write_zero());
        }
        written += n;
        pos += n as u64;
    }
    Ok(())
}

/// Fills `buf` from `pos`, retrying short reads. End of file inside the
/// span is an error.
pub(crate) fn pread_exact(ops: &dyn FileOps, buf: &mut [u8], mut pos: u64) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = ops.pread(&mut buf[filled..], pos)?;
        if n == 0 {
            return Err(StrataError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file ends inside a chunk",
            )));
        }
        filled += n;
        pos += n as u64;
    }
    Ok(())
}

fn write_zero() -> StrataError {
    StrataError::Io(io::Error::new(
        io::ErrorKind::WriteZero,
        "backend accepted zero bytes",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::{MemOps, ShortReadOps, ShortWriteOps};

    #[test]
    fn test_align_to_next_block() {
        assert_eq!(align_to_next_block(0), 0);
        assert_eq!(align_to_next_block(1), 4096);
        assert_eq!(align_to_next_block(4095), 4096);
        assert_eq!(align_to_next_block(4096), 4096);
        assert_eq!(align_to_next_block(4097), 8192);
        assert_eq!(align_to_next_block(12288), 12288);
    }

    #[test]
    fn test_physical_length_zero_bytes() {
        assert_eq!(physical_length(0, 0), 0);
        assert_eq!(physical_length(17, 0), 0);
    }

    #[test]
    fn test_physical_length_from_boundary() {
        // Starting at a boundary, the first fetched byte is a marker.
        assert_eq!(physical_length(0, 1), 2);
        assert_eq!(physical_length(0, 5), 6);
        assert_eq!(physical_length(0, 4095), 4096);
        assert_eq!(physical_length(0, 4096), 4098);
    }

    #[test]
    fn test_physical_length_mid_block() {
        assert_eq!(physical_length(6, 1), 1);
        // Fills the block exactly: no boundary crossed, no marker.
        assert_eq!(physical_length(6, 4090), 4090);
        assert_eq!(physical_length(6, 4091), 4092);
        // 8-byte prefix plus 4090 bytes of payload from offset 6.
        assert_eq!(physical_length(6, 4098), 4099);
    }

    #[test]
    fn test_physical_length_multi_block() {
        assert_eq!(physical_length(1, 3 * 4095), 3 * 4095 + 2);
        // 2048 bytes fill the first block, then 97952 span 24 more boundaries.
        assert_eq!(physical_length(2048, 100_000), 100_000 + 24);
    }

    #[test]
    fn test_write_framed_inserts_marker_at_boundary() {
        let ops = MemOps::new();
        let written = write_framed(&ops, &[0xAB; 5000], 1).unwrap();
        assert_eq!(written, 5001);

        let bytes = ops.bytes();
        assert_eq!(bytes.len(), 5002);
        assert!(bytes[1..4096].iter().all(|&b| b == 0xAB));
        assert_eq!(bytes[4096], DATA_MARKER);
        assert!(bytes[4097..5002].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_write_framed_at_boundary_starts_with_marker() {
        let ops = MemOps::new();
        let written = write_framed(&ops, b"hi", 0).unwrap();
        assert_eq!(written, 3);
        assert_eq!(ops.bytes(), vec![DATA_MARKER, b'h', b'i']);
    }

    #[test]
    fn test_write_framed_exact_fit_no_trailing_marker() {
        let ops = MemOps::new();
        let written = write_framed(&ops, &[0xCD; 2], 4094).unwrap();
        assert_eq!(written, 2);
        // The next block's marker belongs to the next write.
        assert_eq!(ops.bytes().len(), 4096);
    }

    #[test]
    fn test_write_framed_empty_writes_nothing() {
        let ops = MemOps::new();
        assert_eq!(write_framed(&ops, &[], 0).unwrap(), 0);
        assert!(ops.bytes().is_empty());
    }

    #[test]
    fn test_round_trip_at_offsets() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        for pos in [0u64, 1, 6, 4090, 4095, 4096, 8191] {
            let ops = MemOps::new();
            let written = write_framed(&ops, &payload, pos).unwrap();
            assert_eq!(
                written,
                physical_length(pos % BLOCK_SIZE_U64, payload.len() as u64)
            );
            let back = read_framed(&ops, pos, payload.len()).unwrap();
            assert_eq!(back, payload);
        }
    }

    #[test]
    fn test_short_writes_produce_same_layout() {
        let payload: Vec<u8> = (0..9000u32).map(|i| (i % 13) as u8 + 1).collect();

        let full = MemOps::new();
        write_framed(&full, &payload, 4090).unwrap();

        let short = ShortWriteOps {
            inner: MemOps::new(),
            max: 7,
        };
        let written = write_framed(&short, &payload, 4090).unwrap();

        assert_eq!(written, physical_length(4090 % BLOCK_SIZE_U64, 9000));
        assert_eq!(short.inner.bytes(), full.bytes());
    }

    #[test]
    fn test_short_reads_reassemble() {
        let payload: Vec<u8> = (0..9000u32).map(|i| (i % 17) as u8 + 1).collect();
        let inner = MemOps::new();
        write_framed(&inner, &payload, 4090).unwrap();

        // Seven bytes per pread: every call comes back short and the
        // read loop has to keep going.
        let short = ShortReadOps { inner, max: 7 };
        let back = read_framed(&short, 4090, 9000).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_read_framed_ignores_marker_values() {
        let ops = MemOps::new();
        write_framed(&ops, &[0x42; 5000], 1).unwrap();
        // Framing does not police marker values on the way back in.
        ops.pwrite(&[0xFF], 4096).unwrap();

        let back = read_framed(&ops, 1, 5000).unwrap();
        assert_eq!(back, vec![0x42; 5000]);
    }

    #[test]
    fn test_read_framed_hits_eof() {
        let ops = MemOps::new();
        write_framed(&ops, &[1, 2, 3], 1).unwrap();

        let err = read_framed(&ops, 1, 100).unwrap_err();
        match err {
            StrataError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_byte_backend_write_is_an_error() {
        struct ZeroWriteOps;
        impl FileOps for ZeroWriteOps {
            fn pwrite(&self, _buf: &[u8], _pos: u64) -> std::io::Result<usize> {
                Ok(0)
            }
            fn pread(&self, _buf: &mut [u8], _pos: u64) -> std::io::Result<usize> {
                Ok(0)
            }
            fn len(&self) -> std::io::Result<u64> {
                Ok(0)
            }
            fn sync(&self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = write_framed(&ZeroWriteOps, b"data", 1).unwrap_err();
        match err {
            StrataError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::WriteZero),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }
}

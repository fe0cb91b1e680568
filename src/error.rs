use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch at offset {offset}: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        offset: u64,
        stored: u32,
        computed: u32,
    },

    #[error("Corrupt chunk at offset {offset}: {reason}")]
    CorruptChunk { offset: u64, reason: String },

    #[error("Corrupt compressed payload: {0}")]
    CorruptInput(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Out of memory: failed to allocate {0} bytes")]
    OutOfMemory(usize),
}

pub type Result<T> = std::result::Result<T, StrataError>;

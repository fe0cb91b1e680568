//! Payload checksums.
//!
//! Every chunk stores a 32-bit checksum of its payload next to the length
//! field. A file picks one algorithm when it is created and keeps it for
//! life: CRC32 matches existing files, CRC32C is hardware-accelerated on
//! most targets and is the better pick for new files.

/// Checksum algorithm in effect for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumMode {
    /// IEEE CRC32, the original on-disk default.
    #[default]
    Crc32,
    /// Castagnoli CRC32C.
    Crc32c,
}

/// Computes the checksum of `data` under `mode`.
pub fn checksum(mode: ChecksumMode, data: &[u8]) -> u32 {
    match mode {
        ChecksumMode::Crc32 => {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(data);
            hasher.finalize()
        }
        ChecksumMode::Crc32c => crc32c::crc32c(data),
    }
}

/// Checks `data` against a stored checksum.
pub fn verify(mode: ChecksumMode, data: &[u8], expected: u32) -> bool {
    checksum(mode, data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_zero() {
        assert_eq!(checksum(ChecksumMode::Crc32, &[]), 0);
        assert_eq!(checksum(ChecksumMode::Crc32c, &[]), 0);
    }

    #[test]
    fn test_known_check_values() {
        // Standard check strings for both polynomials.
        assert_eq!(checksum(ChecksumMode::Crc32, b"123456789"), 0xCBF4_3926);
        assert_eq!(checksum(ChecksumMode::Crc32c, b"123456789"), 0xE306_9283);
    }

    #[test]
    fn test_modes_disagree() {
        let data = b"block framing";
        assert_ne!(
            checksum(ChecksumMode::Crc32, data),
            checksum(ChecksumMode::Crc32c, data)
        );
    }

    #[test]
    fn test_verify_detects_change() {
        let sum = checksum(ChecksumMode::Crc32, b"payload");
        assert!(verify(ChecksumMode::Crc32, b"payload", sum));
        assert!(!verify(ChecksumMode::Crc32, b"payloae", sum));
        assert!(!verify(ChecksumMode::Crc32, b"payload", sum ^ 1));
    }

    #[test]
    fn test_default_mode_is_crc32() {
        assert_eq!(ChecksumMode::default(), ChecksumMode::Crc32);
    }
}

//! Reflected CRC-32 (polynomial `0xEDB88320`) as used by GPT headers and partition entry arrays.

use crc::{Crc, Digest, CRC_32_ISO_HDLC};

// The lookup table is computed at compile time and never mutated.
static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compute the CRC32 checksum of a byte slice.
///
/// # Examples
///
/// ```
/// assert_eq!(gpt_image::crc32::checksum(b"123456789"), 0xcbf4_3926);
/// ```
pub fn checksum(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

/// Start an incremental checksum, for data that is produced piece by piece.
pub fn digest() -> Digest<'static, u32> {
    CRC32.digest()
}

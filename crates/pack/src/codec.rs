//! LZ4 block codec for chunk payloads.
//!
//! Raw blocks, no size prefix: the chunk header already records both the
//! compressed and uncompressed sizes.

use lz4_flex::block::{self, DecompressError};

pub fn compress_block(data: &[u8]) -> Vec<u8> {
    block::compress(data)
}

pub fn decompress_block(
    data: &[u8],
    uncompressed_size: usize,
) -> Result<Vec<u8>, DecompressError> {
    block::decompress(data, uncompressed_size)
}

/// Decompress a payload and keep only its first `prefix_len` bytes.
///
/// The metadata reader needs just the file-table prefix of each chunk. The
/// pure-Rust decoder has no early-stop entry point, so the block is decoded
/// in full and truncated; the caller never sees bytes past the prefix.
pub fn decompress_prefix(
    data: &[u8],
    uncompressed_size: usize,
    prefix_len: usize,
) -> Result<Vec<u8>, DecompressError> {
    let mut payload = decompress_block(data, uncompressed_size)?;
    payload.truncate(prefix_len);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let data = b"fn main() {}\nfn main() {}\nfn main() {}\n".to_vec();
        let compressed = compress_block(&data);
        let back = decompress_block(&compressed, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_prefix_truncates() {
        let data = b"0123456789abcdef0123456789abcdef".to_vec();
        let compressed = compress_block(&data);
        let prefix = decompress_prefix(&compressed, data.len(), 10).unwrap();
        assert_eq!(prefix, b"0123456789");
    }

    #[test]
    fn test_empty_payload() {
        let compressed = compress_block(b"");
        let back = decompress_block(&compressed, 0).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_garbage_fails() {
        assert!(decompress_block(&[0xff, 0x00, 0x12], 100).is_err());
    }
}

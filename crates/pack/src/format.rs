//! On-disk framing for the `.qgd` pack file.
//!
//! All integers are little-endian. The file is a fixed magic followed by a
//! linear sequence of chunks; each chunk is a [`ChunkHeader`], `extra_size`
//! reserved bytes, the raw bloom filter, then the LZ4 block of the payload.
//! The decompressed payload lays out the file table first, then every file
//! name, then every file body. Names strictly precede bodies so a reader
//! interested only in metadata can stop decompressing at `file_table_size`.

use std::io::{self, Read, Write};

/// Identifies the pack format. A layout or hash-scheme change means a new
/// magic, not a version field.
pub const PACK_MAGIC: [u8; 8] = *b"PGDATA1\0";

/// Target uncompressed chunk size. A chunk may exceed this only when a
/// single line is longer than the whole budget.
pub const CHUNK_SIZE: usize = 512 * 1024;

pub const CHUNK_HEADER_SIZE: usize = 28;
pub const FILE_TABLE_ENTRY_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkHeader {
    pub file_count: u32,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    /// Bloom filter width in bytes; 0 when the index is omitted.
    pub index_size: u32,
    /// Hash count `k` used when the bloom filter was filled.
    pub index_hash_iters: u32,
    /// Prefix of the decompressed payload covering the table and all names.
    pub file_table_size: u32,
    /// Reserved region between header and index; readers skip it.
    pub extra_size: u32,
}

impl ChunkHeader {
    pub fn write_to(&self, mut w: impl Write) -> io::Result<()> {
        w.write_all(&self.file_count.to_le_bytes())?;
        w.write_all(&self.uncompressed_size.to_le_bytes())?;
        w.write_all(&self.compressed_size.to_le_bytes())?;
        w.write_all(&self.index_size.to_le_bytes())?;
        w.write_all(&self.index_hash_iters.to_le_bytes())?;
        w.write_all(&self.file_table_size.to_le_bytes())?;
        w.write_all(&self.extra_size.to_le_bytes())?;
        Ok(())
    }

    /// Read the next chunk header. Returns `None` on a clean end of file;
    /// a partially-present header is an `UnexpectedEof` error.
    pub fn read_from(mut r: impl Read) -> io::Result<Option<Self>> {
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            let n = r.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        Ok(Some(Self {
            file_count: read_u32(&buf[0..4]),
            uncompressed_size: read_u32(&buf[4..8]),
            compressed_size: read_u32(&buf[8..12]),
            index_size: read_u32(&buf[12..16]),
            index_hash_iters: read_u32(&buf[16..20]),
            file_table_size: read_u32(&buf[20..24]),
            extra_size: read_u32(&buf[24..28]),
        }))
    }
}

/// One row of the per-chunk file table. Offsets are relative to the start
/// of the decompressed payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTableEntry {
    pub name_offset: u32,
    pub name_length: u32,
    pub data_offset: u32,
    pub data_size: u32,
    /// Index of the first line of this fragment within its source file.
    pub start_line: u32,
    pub reserved: u32,
    /// Original on-disk byte count, before UTF-8 normalization.
    pub file_size: u64,
    /// Opaque modification stamp (milliseconds since the Unix epoch).
    pub timestamp: u64,
}

impl FileTableEntry {
    pub fn to_bytes(&self) -> [u8; FILE_TABLE_ENTRY_SIZE] {
        let mut buf = [0u8; FILE_TABLE_ENTRY_SIZE];
        buf[0..4].copy_from_slice(&self.name_offset.to_le_bytes());
        buf[4..8].copy_from_slice(&self.name_length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[12..16].copy_from_slice(&self.data_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.start_line.to_le_bytes());
        buf[20..24].copy_from_slice(&self.reserved.to_le_bytes());
        buf[24..32].copy_from_slice(&self.file_size.to_le_bytes());
        buf[32..40].copy_from_slice(&self.timestamp.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; FILE_TABLE_ENTRY_SIZE]) -> Self {
        Self {
            name_offset: read_u32(&buf[0..4]),
            name_length: read_u32(&buf[4..8]),
            data_offset: read_u32(&buf[8..12]),
            data_size: read_u32(&buf[12..16]),
            start_line: read_u32(&buf[16..20]),
            reserved: read_u32(&buf[20..24]),
            file_size: read_u64(&buf[24..32]),
            timestamp: read_u64(&buf[32..40]),
        }
    }
}

fn read_u32(buf: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(buf);
    u32::from_le_bytes(raw)
}

fn read_u64(buf: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(buf);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_chunk_header_round_trip() {
        let header = ChunkHeader {
            file_count: 3,
            uncompressed_size: 4096,
            compressed_size: 800,
            index_size: 1024,
            index_hash_iters: 7,
            file_table_size: 200,
            extra_size: 0,
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), CHUNK_HEADER_SIZE);

        let back = ChunkHeader::read_from(Cursor::new(&buf)).unwrap();
        assert_eq!(back, Some(header));
    }

    #[test]
    fn test_chunk_header_clean_eof() {
        let back = ChunkHeader::read_from(Cursor::new(&[] as &[u8])).unwrap();
        assert_eq!(back, None);
    }

    #[test]
    fn test_chunk_header_truncated() {
        let err = ChunkHeader::read_from(Cursor::new(&[0u8; 10])).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_file_table_entry_round_trip() {
        let entry = FileTableEntry {
            name_offset: 40,
            name_length: 11,
            data_offset: 51,
            data_size: 12345,
            start_line: 17,
            reserved: 0,
            file_size: 1 << 40,
            timestamp: 1_700_000_000_123,
        };

        let bytes = entry.to_bytes();
        assert_eq!(bytes.len(), FILE_TABLE_ENTRY_SIZE);
        assert_eq!(FileTableEntry::from_bytes(&bytes), entry);
    }
}

//! Metadata-only pack reader.
//!
//! The watcher needs `(path, mtime, size)` for every packed file, nothing
//! more, so this reader walks chunk headers and decompresses only the
//! file-table prefix of each payload; bodies stay compressed on disk.

use crate::codec;
use crate::error::{PackError, Result};
use crate::format::{ChunkHeader, FileTableEntry, FILE_TABLE_ENTRY_SIZE, PACK_MAGIC};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Identity of one top-level file recorded in a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String,
    pub timestamp: u64,
    pub file_size: u64,
}

/// List every top-level file of a pack, in pack order.
///
/// Continuation fragments (`start_line > 0`) are not reported; the entry
/// with `start_line == 0` carries the file's metadata.
pub fn read_pack_file_list(path: impl AsRef<Path>) -> Result<Vec<FileInfo>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; PACK_MAGIC.len()];
    if reader.read_exact(&mut magic).is_err() || magic != PACK_MAGIC {
        return Err(PackError::FormatMismatch {
            path: path.to_path_buf(),
        });
    }

    let mut result = Vec::new();
    loop {
        let header = match ChunkHeader::read_from(&mut reader) {
            Ok(Some(header)) => header,
            Ok(None) => break,
            Err(_) => return Err(PackError::corrupt(path, "truncated chunk header")),
        };

        skip(&mut reader, u64::from(header.extra_size) + u64::from(header.index_size))
            .map_err(|_| PackError::corrupt(path, "truncated chunk index"))?;

        let mut compressed = vec![0u8; header.compressed_size as usize];
        reader
            .read_exact(&mut compressed)
            .map_err(|_| PackError::corrupt(path, "truncated chunk payload"))?;

        if header.file_table_size > header.uncompressed_size {
            return Err(PackError::corrupt(path, "file table larger than payload"));
        }
        let table = codec::decompress_prefix(
            &compressed,
            header.uncompressed_size as usize,
            header.file_table_size as usize,
        )
        .map_err(|e| PackError::corrupt(path, format!("decompression failed: {e}")))?;

        collect_chunk_files(path, &header, &table, &mut result)?;
    }

    Ok(result)
}

fn collect_chunk_files(
    path: &Path,
    header: &ChunkHeader,
    table: &[u8],
    out: &mut Vec<FileInfo>,
) -> Result<()> {
    let count = header.file_count as usize;
    if table.len() < count * FILE_TABLE_ENTRY_SIZE {
        return Err(PackError::corrupt(path, "file table shorter than declared"));
    }

    for i in 0..count {
        let row = &table[i * FILE_TABLE_ENTRY_SIZE..(i + 1) * FILE_TABLE_ENTRY_SIZE];
        let mut raw = [0u8; FILE_TABLE_ENTRY_SIZE];
        raw.copy_from_slice(row);
        let entry = FileTableEntry::from_bytes(&raw);

        if entry.start_line != 0 {
            continue;
        }

        let name_start = entry.name_offset as usize;
        let name_end = name_start.saturating_add(entry.name_length as usize);
        // the name must land inside the decompressed prefix, never in the
        // body region past it
        if name_end > table.len() || name_start > name_end {
            return Err(PackError::corrupt(path, "file name outside table prefix"));
        }

        let name = std::str::from_utf8(&table[name_start..name_end])
            .map_err(|_| PackError::corrupt(path, "file name is not UTF-8"))?;

        out.push(FileInfo {
            path: name.to_string(),
            timestamp: entry.timestamp,
            file_size: entry.file_size,
        });
    }

    Ok(())
}

fn skip(reader: &mut impl Read, n: u64) -> std::io::Result<()> {
    let copied = std::io::copy(&mut reader.by_ref().take(n), &mut std::io::sink())?;
    if copied < n {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

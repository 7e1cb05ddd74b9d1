//! Streaming pack builder.
//!
//! Appended file bodies accumulate in a pending queue; once enough bytes are
//! buffered the builder cuts a line-aligned chunk, indexes it, compresses it
//! and appends it to the output file. Cutting waits for twice the chunk
//! budget so one cut never leaves a short tail that the very next append
//! would have filled.

use crate::blob::Blob;
use crate::bloom::{self, BloomFilter};
use crate::codec;
use crate::encoding::to_utf8;
use crate::error::Result;
use crate::format::{ChunkHeader, FileTableEntry, CHUNK_SIZE, FILE_TABLE_ENTRY_SIZE, PACK_MAGIC};
use crate::stats::PackStats;
use memchr::{memchr, memchr_iter, memrchr};
use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// A line-aligned slice of one source file waiting to be chunked.
struct PendingFile {
    name: String,
    start_line: u32,
    file_size: u64,
    timestamp: u64,
    contents: Blob,
}

struct Chunk {
    files: Vec<PendingFile>,
    total_size: usize,
}

impl Chunk {
    fn push(&mut self, file: PendingFile) {
        self.total_size += file.contents.len();
        self.files.push(file);
    }
}

/// Writes a `.qgd` pack: header at creation, then one chunk per cut.
///
/// Output I/O errors are fatal for the build and surface to the caller,
/// which is expected to delete the partial pack. Failures reading an input
/// file only fail that append; the builder stays usable.
pub struct PackBuilder {
    out: BufWriter<File>,
    chunk_size: usize,
    pending: VecDeque<PendingFile>,
    pending_bytes: usize,
    stats: PackStats,
}

impl PackBuilder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_chunk_size(path, CHUNK_SIZE)
    }

    /// Create a builder with a non-default chunk budget. Packs written with
    /// a different budget remain readable; the budget only shapes cuts.
    pub fn with_chunk_size(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        assert!(chunk_size > 0, "chunk size must be positive");

        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        out.write_all(&PACK_MAGIC)?;

        Ok(Self {
            out,
            chunk_size,
            pending: VecDeque::new(),
            pending_bytes: 0,
            stats: PackStats::default(),
        })
    }

    /// Read `path`, normalize it to UTF-8 and enqueue it under `name` as a
    /// whole-file fragment.
    pub fn append_file(&mut self, path: &Path, name: &str) -> Result<()> {
        let (timestamp, file_size) = file_attributes(path)?;
        let contents = to_utf8(std::fs::read(path)?);
        self.append_file_part(name, 0, contents, timestamp, file_size)
    }

    /// Enqueue an already-read fragment. `start_line` is the index of its
    /// first line within the source file; `file_size` is the original
    /// on-disk byte count.
    pub fn append_file_part(
        &mut self,
        name: &str,
        start_line: u32,
        contents: Vec<u8>,
        timestamp: u64,
        file_size: u64,
    ) -> Result<()> {
        let contents = Blob::new(contents);
        self.pending_bytes += contents.len();
        self.pending.push_back(PendingFile {
            name: name.to_string(),
            start_line,
            file_size,
            timestamp,
            contents,
        });

        // 2x hysteresis: cutting earlier would emit short chunks that the
        // next append could have filled.
        while self.pending_bytes >= self.chunk_size * 2 {
            self.cut_chunk()?;
        }
        Ok(())
    }

    /// Drain every pending fragment into chunks. The last chunk may be
    /// short; empty files still produce an entry.
    pub fn flush(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            self.cut_chunk()?;
        }
        Ok(())
    }

    /// Flush pending data and sync the pack to disk, returning final
    /// statistics. The file is durable before the caller renames it over
    /// the previous pack.
    pub fn finish(mut self) -> Result<PackStats> {
        self.flush()?;
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(self.stats)
    }

    pub fn stats(&self) -> PackStats {
        self.stats
    }

    /// Assemble one chunk from the head of the pending queue.
    ///
    /// Fragments are taken whole while they fit. The first fragment that
    /// does not fit is split on a line boundary within the remaining budget;
    /// if it has no newline there, either the chunk closes early (when it
    /// already holds something) or the fragment's entire first line is taken
    /// over-budget (a chunk must never be empty).
    fn cut_chunk(&mut self) -> Result<()> {
        let mut chunk = Chunk {
            files: Vec::new(),
            total_size: 0,
        };

        while chunk.total_size < self.chunk_size {
            let Some(mut file) = self.pending.pop_front() else {
                break;
            };

            let remaining = self.chunk_size - chunk.total_size;
            if file.contents.len() <= remaining {
                chunk.push(file);
                continue;
            }

            if let Some(prefix) = split_line_prefix(&mut file, remaining, chunk.files.is_empty()) {
                chunk.push(prefix);
            }
            if !file.contents.is_empty() {
                self.pending.push_front(file);
            }
            // nothing else fits once a fragment had to be split
            break;
        }

        debug_assert!(chunk.total_size <= self.pending_bytes);
        self.pending_bytes -= chunk.total_size;

        self.emit_chunk(&chunk)
    }

    fn emit_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if chunk.files.is_empty() {
            return Ok(());
        }

        let payload = build_payload(&chunk.files);
        let (index, iterations) = build_index(&chunk.files, chunk.total_size);
        let compressed = codec::compress_block(&payload);

        let header = ChunkHeader {
            file_count: chunk.files.len() as u32,
            uncompressed_size: payload.len() as u32,
            compressed_size: compressed.len() as u32,
            index_size: index.len() as u32,
            index_hash_iters: iterations,
            file_table_size: file_table_size(&chunk.files) as u32,
            extra_size: 0,
        };

        header.write_to(&mut self.out)?;
        if !index.is_empty() {
            self.out.write_all(&index)?;
        }
        self.out.write_all(&compressed)?;

        log::debug!(
            "chunk: {} entries, {} -> {} bytes, index {} bytes",
            chunk.files.len(),
            payload.len(),
            compressed.len(),
            index.len()
        );

        for file in &chunk.files {
            if file.start_line == 0 {
                self.stats.file_count += 1;
            }
        }
        self.stats.uncompressed_bytes += payload.len() as u64;
        self.stats.compressed_bytes += compressed.len() as u64;

        Ok(())
    }
}

/// Modification stamp (ms since the Unix epoch) and size of a file, as the
/// builder records them and the watcher compares them.
pub fn file_attributes(path: &Path) -> io::Result<(u64, u64)> {
    let meta = std::fs::metadata(path)?;
    let timestamp = meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Ok((timestamp, meta.len()))
}

/// Take a line-aligned prefix of at most `budget` bytes off `file`.
///
/// Returns `None` when no newline falls inside the budget and the chunk
/// already holds data: the caller closes the chunk and re-queues the file.
/// When the chunk is still empty the whole first line is taken instead,
/// however long it is.
fn split_line_prefix(
    file: &mut PendingFile,
    budget: usize,
    chunk_is_empty: bool,
) -> Option<PendingFile> {
    let data = file.contents.as_slice();
    debug_assert!(budget < data.len());

    if let Some(pos) = memrchr(b'\n', &data[..budget]) {
        let take = pos + 1;
        let lines = memchr_iter(b'\n', &data[..take]).count() as u32;
        return Some(take_prefix(file, take, lines));
    }

    if chunk_is_empty {
        let take = match memchr(b'\n', data) {
            Some(pos) => pos + 1,
            None => data.len(),
        };
        return Some(take_prefix(file, take, 1));
    }

    None
}

fn take_prefix(file: &mut PendingFile, n: usize, lines: u32) -> PendingFile {
    let prefix = PendingFile {
        name: file.name.clone(),
        start_line: file.start_line,
        file_size: file.file_size,
        timestamp: file.timestamp,
        contents: file.contents.split_to(n),
    };
    file.start_line += lines;
    prefix
}

fn file_table_size(files: &[PendingFile]) -> usize {
    FILE_TABLE_ENTRY_SIZE * files.len() + files.iter().map(|f| f.name.len()).sum::<usize>()
}

/// Lay out the decompressed payload: table rows, then all names, then all
/// bodies. Names must precede bodies so `file_table_size` bounds everything
/// the metadata reader needs.
fn build_payload(files: &[PendingFile]) -> Vec<u8> {
    let table_size = FILE_TABLE_ENTRY_SIZE * files.len();
    let name_total: usize = files.iter().map(|f| f.name.len()).sum();
    let data_total: usize = files.iter().map(|f| f.contents.len()).sum();

    let mut payload = Vec::with_capacity(table_size + name_total + data_total);

    let mut name_offset = table_size;
    let mut data_offset = table_size + name_total;
    for file in files {
        let entry = FileTableEntry {
            name_offset: name_offset as u32,
            name_length: file.name.len() as u32,
            data_offset: data_offset as u32,
            data_size: file.contents.len() as u32,
            start_line: file.start_line,
            reserved: 0,
            file_size: file.file_size,
            timestamp: file.timestamp,
        };
        payload.extend_from_slice(&entry.to_bytes());

        name_offset += file.name.len();
        data_offset += file.contents.len();
    }
    debug_assert_eq!(name_offset, table_size + name_total);
    debug_assert_eq!(data_offset, table_size + name_total + data_total);

    for file in files {
        payload.extend_from_slice(file.name.as_bytes());
    }
    for file in files {
        payload.extend_from_slice(file.contents.as_slice());
    }
    debug_assert_eq!(payload.len(), table_size + name_total + data_total);

    payload
}

fn build_index(files: &[PendingFile], content_bytes: usize) -> (Vec<u8>, u32) {
    let index_size = bloom::index_size_for(content_bytes);
    if index_size == 0 {
        return (Vec::new(), 0);
    }

    let mut ngrams = HashSet::new();
    for file in files {
        bloom::collect_ngrams(file.contents.as_slice(), &mut ngrams);
    }

    let iterations = bloom::hash_iterations(index_size, ngrams.len());
    let mut filter = BloomFilter::new(index_size);
    for &value in &ngrams {
        filter.insert(value, iterations);
    }

    (filter.into_bytes(), iterations)
}

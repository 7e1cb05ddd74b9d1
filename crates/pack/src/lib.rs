//! # packgrep pack format
//!
//! Builder and metadata reader for the `.qgd` data pack: the whole project's
//! source text packed into LZ4 chunks, each carrying a 4-gram bloom filter so
//! the search side can skip chunks that cannot contain a query.
//!
//! ## Pipeline
//!
//! ```text
//! File bodies (UTF-8 normalized)
//!     │
//!     ├──> PackBuilder (line-aligned chunking)
//!     │      ├─> bloom index per chunk
//!     │      └─> LZ4 block per chunk
//!     │
//!     └──> .qgd  =  PackHeader + Chunk*
//!
//! read_pack_file_list: chunk headers + file-table prefix only
//!     └─> (path, mtime, size) per top-level file
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use packgrep_pack::PackBuilder;
//!
//! fn main() -> packgrep_pack::Result<()> {
//!     let mut builder = PackBuilder::create("project.qgd")?;
//!     builder.append_file("src/main.rs".as_ref(), "src/main.rs")?;
//!     let stats = builder.finish()?;
//!     println!("{} files packed", stats.file_count);
//!     Ok(())
//! }
//! ```

mod blob;
mod bloom;
mod builder;
mod codec;
mod encoding;
mod error;
mod format;
mod reader;
mod stats;

pub use blob::Blob;
pub use bloom::{hash_iterations, index_size_for, ngram, BloomFilter, MAX_HASH_ITERATIONS};
pub use builder::{file_attributes, PackBuilder};
pub use codec::{compress_block, decompress_block, decompress_prefix};
pub use encoding::to_utf8;
pub use error::{PackError, Result};
pub use format::{
    ChunkHeader, FileTableEntry, CHUNK_HEADER_SIZE, CHUNK_SIZE, FILE_TABLE_ENTRY_SIZE, PACK_MAGIC,
};
pub use reader::{read_pack_file_list, FileInfo};
pub use stats::PackStats;

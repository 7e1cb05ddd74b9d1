/// Running totals for one pack build.
///
/// `file_count` counts source files, not fragments: a file split across
/// chunks contributes once, via its `start_line == 0` entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    pub file_count: u32,
    /// Uncompressed payload bytes written across all chunks.
    pub uncompressed_bytes: u64,
    /// Compressed payload bytes written across all chunks.
    pub compressed_bytes: u64,
}

//! Drift detection and the `.qgc` changes file.

use crate::config::temp_sibling;
use packgrep_pack::FileInfo;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Diff the on-disk project against pack metadata.
///
/// Both inputs are sorted by path (the scanner sorts; the pack was built in
/// scan order). A path only in `current` is new; a shared path with a
/// different timestamp or size is modified. Paths only in the pack are not
/// reported; deleted files are reconciled by the next full repack.
pub fn collect_changes(current: &[FileInfo], pack: &[FileInfo]) -> Vec<String> {
    let mut changed = Vec::new();
    let mut i = 0;

    for packed in pack {
        while i < current.len() && current[i].path < packed.path {
            changed.push(current[i].path.clone());
            i += 1;
        }
        if i < current.len() && current[i].path == packed.path {
            if current[i].timestamp != packed.timestamp || current[i].file_size != packed.file_size
            {
                changed.push(current[i].path.clone());
            }
            i += 1;
        }
    }
    while i < current.len() {
        changed.push(current[i].path.clone());
        i += 1;
    }

    changed
}

/// Replace the changes file with a new sorted snapshot.
///
/// The snapshot is written to a sibling temp path and renamed into place,
/// so a concurrent reader sees either the old list or the new one, never a
/// torn write. An empty snapshot removes the file instead.
pub fn write_changes_file(path: &Path, files: &[String]) -> io::Result<()> {
    if files.is_empty() {
        return remove_changes_file(path);
    }

    let temp = temp_sibling(path);
    {
        let mut out = BufWriter::new(File::create(&temp)?);
        for file in files {
            out.write_all(file.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
    std::fs::rename(&temp, path)
}

pub fn remove_changes_file(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(path: &str, timestamp: u64, file_size: u64) -> FileInfo {
        FileInfo {
            path: path.to_string(),
            timestamp,
            file_size,
        }
    }

    #[test]
    fn test_diff_reports_modified_and_added() {
        let pack = vec![info("a", 1, 10), info("b", 2, 20)];
        let current = vec![info("a", 1, 10), info("b", 3, 20), info("c", 4, 5)];

        assert_eq!(collect_changes(&current, &pack), vec!["b", "c"]);
    }

    #[test]
    fn test_diff_reports_size_change() {
        let pack = vec![info("a", 1, 10)];
        let current = vec![info("a", 1, 11)];

        assert_eq!(collect_changes(&current, &pack), vec!["a"]);
    }

    #[test]
    fn test_diff_reports_file_sorting_before_pack_head() {
        let pack = vec![info("m", 1, 1)];
        let current = vec![info("a", 5, 5), info("m", 1, 1)];

        assert_eq!(collect_changes(&current, &pack), vec!["a"]);
    }

    #[test]
    fn test_diff_ignores_deletions() {
        let pack = vec![info("a", 1, 10), info("b", 2, 20)];
        let current = vec![info("a", 1, 10)];

        assert_eq!(collect_changes(&current, &pack), Vec::<String>::new());
    }

    #[test]
    fn test_diff_empty_pack_reports_everything() {
        let current = vec![info("a", 1, 1), info("b", 2, 2)];
        assert_eq!(collect_changes(&current, &[]), vec!["a", "b"]);
    }

    #[test]
    fn test_changes_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proj.qgc");

        write_changes_file(&path, &["b".to_string(), "c".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b\nc\n");

        // no temp file left behind
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn test_empty_snapshot_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proj.qgc");

        write_changes_file(&path, &["x".to_string()]).unwrap();
        assert!(path.exists());

        write_changes_file(&path, &[]).unwrap();
        assert!(!path.exists());

        // removing an absent file is fine
        write_changes_file(&path, &[]).unwrap();
    }
}

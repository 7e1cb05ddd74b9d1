//! One-shot pack builds.

use crate::changes::remove_changes_file;
use crate::config::{temp_sibling, ProjectConfig};
use crate::error::Result;
use crate::scanner::{FileScanner, ScannedFile};
use packgrep_pack::{PackBuilder, PackStats};
use std::path::Path;

/// Snapshot handed to the progress callback after every appended file.
#[derive(Debug, Clone, Copy)]
pub struct BuildProgress {
    pub files_done: usize,
    pub files_total: usize,
    pub stats: PackStats,
}

/// Scan a project and write its pack.
///
/// The pack is assembled at a sibling temp path and renamed over the real
/// target only on success, so a crashed or failed build never leaves a
/// half-written `.qgd` behind. Unreadable input files are logged and
/// skipped; the build keeps going.
pub fn build_project(
    project: impl AsRef<Path>,
    progress: impl FnMut(BuildProgress),
) -> Result<PackStats> {
    let project = project.as_ref();
    let config = ProjectConfig::load(project)?;

    log::info!("Building {}", project.display());
    let files = FileScanner::new(&config).scan();
    log::info!("Packing {} files", files.len());

    let target = config.pack_path();
    let temp = temp_sibling(&target);

    match write_pack(&files, &temp, progress) {
        Ok(stats) => {
            std::fs::rename(&temp, &target)?;
            log::info!(
                "Packed {} files, {} bytes in, {} bytes out",
                stats.file_count,
                stats.uncompressed_bytes,
                stats.compressed_bytes
            );
            Ok(stats)
        }
        Err(err) => {
            let _ = std::fs::remove_file(&temp);
            Err(err)
        }
    }
}

/// Repack a project and drop its accumulated changes file.
pub fn update_project(project: impl AsRef<Path>) -> Result<()> {
    let project = project.as_ref();
    let config = ProjectConfig::load(project)?;

    build_project(project, |_| {})?;
    remove_changes_file(&config.changes_path())?;
    Ok(())
}

fn write_pack(
    files: &[ScannedFile],
    out: &Path,
    mut progress: impl FnMut(BuildProgress),
) -> Result<PackStats> {
    let mut builder = PackBuilder::create(out)?;

    for (done, file) in files.iter().enumerate() {
        if let Err(err) = builder.append_file(&file.abs_path, &file.info.path) {
            log::error!("Error reading file {}: {err}", file.abs_path.display());
        }
        progress(BuildProgress {
            files_done: done + 1,
            files_total: files.len(),
            stats: builder.stats(),
        });
    }

    Ok(builder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use packgrep_pack::read_pack_file_list;
    use pretty_assertions::assert_eq;

    fn make_project(dir: &Path) -> std::path::PathBuf {
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(dir.join("src/a.rs"), "fn a() {}\n").unwrap();
        std::fs::write(dir.join("src/b.rs"), "fn b() {}\n").unwrap();

        let project = dir.join("proj.toml");
        std::fs::write(&project, "roots = [\"src\"]\n").unwrap();
        project
    }

    #[test]
    fn test_build_writes_pack_at_derived_path() {
        let dir = tempfile::tempdir().unwrap();
        let project = make_project(dir.path());

        let stats = build_project(&project, |_| {}).unwrap();
        assert_eq!(stats.file_count, 2);

        let files = read_pack_file_list(dir.path().join("proj.qgd")).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(names, vec!["src/a.rs", "src/b.rs"]);

        // no temp pack left behind
        assert!(!dir.path().join("proj.qgd_").exists());
    }

    #[test]
    fn test_progress_reaches_total() {
        let dir = tempfile::tempdir().unwrap();
        let project = make_project(dir.path());

        let mut seen = Vec::new();
        build_project(&project, |p| seen.push((p.files_done, p.files_total))).unwrap();
        assert_eq!(seen.last(), Some(&(2, 2)));
    }

    #[test]
    fn test_update_removes_changes_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = make_project(dir.path());
        std::fs::write(dir.path().join("proj.qgc"), "src/a.rs\n").unwrap();

        update_project(&project).unwrap();

        assert!(dir.path().join("proj.qgd").exists());
        assert!(!dir.path().join("proj.qgc").exists());
    }
}

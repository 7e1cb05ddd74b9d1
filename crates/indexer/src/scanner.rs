//! Project file discovery.
//!
//! Walks every configured root (gitignore-aware, hidden files skipped),
//! applies the project's include/exclude rules and returns the surviving
//! files sorted by normalized path, the order the builder packs them in
//! and the differ assumes.

use crate::config::ProjectConfig;
use ignore::WalkBuilder;
use packgrep_pack::{file_attributes, FileInfo};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// One discovered file: where it lives on disk plus the identity recorded
/// in the pack.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub abs_path: PathBuf,
    pub info: FileInfo,
}

pub struct FileScanner<'a> {
    config: &'a ProjectConfig,
}

impl<'a> FileScanner<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self { config }
    }

    pub fn scan(&self) -> Vec<ScannedFile> {
        let mut files = Vec::new();
        let own = own_file_names(self.config);

        for root in self.config.roots() {
            for entry in WalkBuilder::new(root).build() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        log::warn!("Scan error under {}: {err}", root.display());
                        continue;
                    }
                };
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }

                let path = entry.path();
                let name = normalize_path(self.config.base(), path);
                if own.contains(&name) || !self.config.is_file_acceptable(&name) {
                    continue;
                }

                let (timestamp, file_size) = match file_attributes(path) {
                    Ok(attrs) => attrs,
                    Err(err) => {
                        log::warn!("Cannot stat {}: {err}", path.display());
                        continue;
                    }
                };

                files.push(ScannedFile {
                    abs_path: path.to_path_buf(),
                    info: FileInfo {
                        path: name,
                        timestamp,
                        file_size,
                    },
                });
            }
        }

        files.sort_by(|a, b| a.info.path.cmp(&b.info.path));
        files
    }
}

/// The project file, the pack, the changes file and their temp siblings:
/// neither the scanner nor the watcher treats them as project content.
pub(crate) fn own_file_names(config: &ProjectConfig) -> HashSet<String> {
    let mut names = HashSet::new();
    for path in config.own_files() {
        let name = normalize_path(config.base(), &path);
        names.insert(format!("{name}_"));
        names.insert(name);
    }
    names
}

/// Canonical path string: relative to the project base when possible,
/// `/`-separated on every platform. The same function normalizes scan
/// results and watch notifications, so the two sides always compare equal.
pub fn normalize_path(base: &Path, path: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) => rel
            .components()
            .filter_map(|comp| match comp {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        // roots outside the project directory keep their full path
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}

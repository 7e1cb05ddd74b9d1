//! Project configuration.
//!
//! A project is described by a small TOML file; the pack and changes files
//! live next to it, named by swapping the extension (`proj.toml` →
//! `proj.qgd` / `proj.qgc`).

use crate::error::{IndexError, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// On-disk shape of the project file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectManifest {
    /// Directories to scan and watch, relative to the project file.
    #[serde(default)]
    roots: Vec<PathBuf>,
    /// Glob patterns a path must match to be packed. Empty means all files.
    #[serde(default)]
    include: Vec<String>,
    /// Glob patterns that reject a path even when included.
    #[serde(default)]
    exclude: Vec<String>,
}

/// A loaded project: resolved roots plus compiled filter rules.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    project_path: PathBuf,
    base: PathBuf,
    roots: Vec<PathBuf>,
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
}

impl ProjectConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| IndexError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let manifest: ProjectManifest = toml::from_str(&text).map_err(|e| IndexError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let roots = if manifest.roots.is_empty() {
            vec![base.clone()]
        } else {
            manifest.roots.iter().map(|r| base.join(r)).collect()
        };

        Ok(Self {
            project_path: path.to_path_buf(),
            base,
            roots,
            include: compile_patterns(path, &manifest.include)?,
            exclude: compile_patterns(path, &manifest.exclude)?,
        })
    }

    /// Directory that normalized path names are relative to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn pack_path(&self) -> PathBuf {
        self.project_path.with_extension("qgd")
    }

    pub fn changes_path(&self) -> PathBuf {
        self.project_path.with_extension("qgc")
    }

    /// Files the tool itself maintains next to the project; the scanner and
    /// watcher never treat these as project content.
    pub(crate) fn own_files(&self) -> [PathBuf; 3] {
        [
            self.project_path.clone(),
            self.pack_path(),
            self.changes_path(),
        ]
    }

    /// Apply the project's include/exclude rules to a normalized path.
    pub fn is_file_acceptable(&self, path: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(path)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(path))
    }
}

fn compile_patterns(project: &Path, patterns: &[String]) -> Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| IndexError::Config {
                path: project.to_path_buf(),
                reason: format!("bad pattern {p:?}: {e}"),
            })
        })
        .collect()
}

/// Sibling temp path used for atomic replaces: `<name>` → `<name>_`.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("out"));
    name.push("_");
    path.with_file_name(name)
}

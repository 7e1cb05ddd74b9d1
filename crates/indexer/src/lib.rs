//! # packgrep indexer
//!
//! Project-level orchestration around the pack format: scanning, one-shot
//! builds and the live change watcher.
//!
//! ## Pipeline
//!
//! ```text
//! project.toml
//!     │
//!     ├──> FileScanner (gitignore aware, include/exclude globs)
//!     │      └─> sorted file list
//!     │
//!     ├──> build_project ──> project.qgd   (temp write + atomic rename)
//!     │
//!     └──> WatchSession
//!            ├─> notifier thread per root (notify)
//!            ├─> startup diff vs pack metadata
//!            └─> project.qgc updates, or repack once a burst quiesces
//! ```

mod build;
mod changes;
mod config;
mod error;
mod scanner;
mod watcher;

pub use build::{build_project, update_project, BuildProgress};
pub use changes::{collect_changes, remove_changes_file, write_changes_file};
pub use config::ProjectConfig;
pub use error::{IndexError, Result};
pub use scanner::{normalize_path, FileScanner, ScannedFile};
pub use watcher::{
    WatchConfig, WatchHandle, WatchSession, WATCH_UPDATE_THRESHOLD_FILES, WATCH_UPDATE_TIMEOUT,
};

pub use packgrep_pack::{FileInfo, PackStats};

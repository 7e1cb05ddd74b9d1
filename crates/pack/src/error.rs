use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackError>;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: unrecognized pack format, rebuild the pack to update it", path.display())]
    FormatMismatch { path: PathBuf },

    #[error("{}: malformed pack: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl PackError {
    pub(crate) fn corrupt(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

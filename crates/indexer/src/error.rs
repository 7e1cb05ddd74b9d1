use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pack(#[from] packgrep_pack::PackError),

    #[error("invalid project file {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),
}

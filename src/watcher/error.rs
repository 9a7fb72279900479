//! Error types for the recursive watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("no such watch: {}", path.display())]
    NonExistentWatch { path: PathBuf },

    #[error("can't use /... with non-recursive watch {}", path.display())]
    RecursionMismatch { path: PathBuf },

    #[error("walking directory tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("file system backend error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Cannot watch path {}: {reason}", path.display())]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("watcher is closed")]
    Closed,
}

impl WatchError {
    /// True when the error means a path disappeared before it could be read.
    ///
    /// Directories that are created and removed again in quick succession
    /// produce this while the pipeline is still extending coverage.
    pub fn is_vanished(&self) -> bool {
        match self {
            WatchError::Walk(e) => e
                .io_error()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound),
            WatchError::Notify(e) => matches!(e.kind, notify::ErrorKind::PathNotFound),
            _ => false,
        }
    }
}

//! Error types for document diffs.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for diff operations
pub type Result<T> = std::result::Result<T, DiffError>;

/// Error type for diff operations
#[derive(Error, Debug)]
pub enum DiffError {
    /// An input document could not be read
    #[error(transparent)]
    Read(#[from] texkit_core::TexkitError),

    /// Failed to write the diff document
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// Output path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl DiffError {
    /// Create a write error
    #[inline]
    #[must_use = "returns DiffError for output write failures"]
    pub fn write_error<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::WriteError {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

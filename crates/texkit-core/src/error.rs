//! Error types for document assembly.
//!
//! Most problems found while assembling a document are not errors at all:
//! missing include targets, unknown citation keys, dangling references and
//! similar conditions are recorded as [`Diagnostic`](crate::Diagnostic)s and
//! processing continues. The variants here are the conditions that stop a
//! run or a single file read.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for assembly operations
pub type Result<T> = std::result::Result<T, TexkitError>;

/// Error type for assembly operations
#[derive(Error, Debug)]
pub enum TexkitError {
    /// Inclusion nesting went past the configured limit.
    ///
    /// This is the only failure that aborts a whole [`process`] run; no
    /// output is produced when it fires.
    ///
    /// [`process`]: crate::DocumentAssembler::process
    #[error("Maximum inclusion depth {max_depth} exceeded for {path}")]
    RecursionDepthExceeded {
        /// File that would have been read past the limit
        path: PathBuf,
        /// Configured depth limit
        max_depth: usize,
    },

    /// Failed to read a file from disk
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File bytes could not be decoded as UTF-8 nor as the legacy fallback
    #[error("Failed to decode {path} as UTF-8 or {fallback}")]
    DecodeError {
        /// Path to the undecodable file
        path: PathBuf,
        /// Name of the fallback encoding that was tried
        fallback: &'static str,
    },

    /// Failed to write the assembled output
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// Output path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl TexkitError {
    /// Create a read error
    #[inline]
    #[must_use = "returns TexkitError for file read failures"]
    pub fn read_error<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a write error
    #[inline]
    #[must_use = "returns TexkitError for file write failures"]
    pub fn write_error<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::WriteError {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this error aborts an assembly run
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::RecursionDepthExceeded { .. } | Self::WriteError { .. })
    }
}

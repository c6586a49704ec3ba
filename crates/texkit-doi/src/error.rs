//! Error types for DOI validation.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for DOI operations
pub type Result<T> = std::result::Result<T, DoiError>;

/// Error type for DOI operations
#[derive(Error, Debug)]
pub enum DoiError {
    /// The bibliography could not be loaded
    #[error(transparent)]
    Bibliography(#[from] texkit_core::TexkitError),

    /// Failed to write the cache file
    #[error("Failed to write cache {path}: {source}")]
    CacheWrite {
        /// Cache file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Failed to serialize the cache
    #[error("Failed to serialize cache: {0}")]
    CacheFormat(#[from] serde_json::Error),

    /// HTTP client construction or request failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The resolver answered with a status that says nothing about the DOI
    #[error("Unexpected HTTP {status} from {url}")]
    UnexpectedStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },
}

impl DoiError {
    /// Create a cache write error
    #[inline]
    #[must_use = "returns DoiError for cache write failures"]
    pub fn cache_write<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::CacheWrite {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

//! Error types for zearch
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Query-time misses are deliberately absent from this enum: an unknown term
//! yields an empty postings list and an out-of-range composite id yields
//! `None`. Errors are reserved for open, build and flush failures.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for zearch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the zearch index
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error without path context
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// I/O error on a specific index file or directory
    #[error("I/O error on '{}': {source}", path.display())]
    SegmentIo {
        /// File or directory the operation failed on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Malformed on-disk structure detected while opening
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Configuration could not be parsed or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A packed format cannot represent the requested value
    #[error("Limit exceeded: {what} {actual} exceeds maximum {max}")]
    LimitExceeded {
        /// What overflowed (ordinal, segment count, blob size)
        what: &'static str,
        /// Value that was requested
        actual: u64,
        /// Largest representable value
        max: u64,
    },

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::SegmentIo {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Corruption`].
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }
}

/// Attach a path to a raw `io::Result`.
pub trait IoResultExt<T> {
    /// Map the error into [`Error::SegmentIo`] carrying `path`.
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| Error::io_at(path, e))
    }
}

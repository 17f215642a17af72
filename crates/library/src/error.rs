//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The name can't be used as a storage key (directories, traversal,
    /// hidden files, empty).
    #[display("invalid video name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// A video with this filename is already stored. Nothing was written.
    #[display("a video named {_0:?} already exists")]
    Duplicate(#[error(not(source))] String),
    /// A storage directory operation (write, stat, rename, delete) failed.
    #[display("storage directory operation failed")]
    Storage,
    /// A metadata store query failed.
    #[display("metadata store operation failed")]
    Metadata,
    /// Checksumming the stored file failed.
    #[display("could not hash stored video")]
    Hash,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Metadata | Self::Hash)
    }
}

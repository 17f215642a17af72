//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A config file given explicitly doesn't exist.
    #[display("config file not found: {}", _0.display())]
    Missing(#[error(not(source))] PathBuf),
    /// Merging or deserializing the config sources failed.
    #[display("could not load configuration")]
    Load,
    /// The config loaded but makes no sense.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// Relative paths can't be resolved without a working directory.
    #[display("could not determine working directory")]
    WorkingDirectory,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

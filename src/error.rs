//! Application Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open storage directory")]
    Storage,
    #[display("could not open metadata database")]
    Metadata,
    /// The file to upload couldn't be opened.
    #[display("could not read {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    /// The request was refused; the message has already been shown.
    #[display("{_0}")]
    Rejected(#[error(not(source))] String),
    #[display("{_0} failed")]
    Command(#[error(not(source))] &'static str),
}

//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file is missing, unreadable, or not a zip archive. Don't retry
    /// with the same input.
    #[display("unable to open archive")]
    Open,
    /// An entry inside the archive could not be read (corrupt data).
    #[display("unable to read archive entry")]
    Read,
    /// A directory inside the destination could not be created.
    #[display("unable to create directory: {}", _0.display())]
    CreateDir(#[error(not(source))] PathBuf),
    /// A file inside the destination could not be written.
    #[display("unable to write file: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// The archive expands beyond the configured size limit (in bytes).
    #[display("archive exceeds size limit of {_0} bytes")]
    TooLarge(#[error(not(source))] u64),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CreateDir(_) | Self::Write(_))
    }
}

//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Archive and filesystem failures are
//! lifted into these categories at the [`ArtifactStore`](crate::ArtifactStore)
//! boundary; nothing below it escapes as a raw platform error.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The media record's raw file is absent (or its filename is unusable).
    #[display("source file missing: {}", _0.display())]
    SourceMissing(#[error(not(source))] PathBuf),
    /// The candidate file is not a course package.
    #[display("invalid course archive: {}", _0.display())]
    InvalidArchive(#[error(not(source))] PathBuf),
    /// The archive could not be opened or unpacked into a fresh artifact.
    #[display("extraction failed")]
    Extraction,
    /// The raw file could not be replaced at its canonical location.
    #[display("unable to replace file: {}", _0.display())]
    Copy(#[error(not(source))] PathBuf),
    /// A string that should have been an artifact token wasn't.
    #[display("invalid artifact token: {_0}")]
    InvalidToken(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Extraction | Self::Copy(_))
    }
}

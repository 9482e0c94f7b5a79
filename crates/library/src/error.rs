//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Failures from the artifact store and
//! the record database stay attached as children of these kinds.

use derive_more::{Display, Error};
use elpx_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies a failed media operation by what the caller should report.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No media record with this id.
    #[display("media not found: {_0}")]
    NotFound(#[error(not(source))] u64),
    /// The uploaded file is not a course package.
    #[display("invalid course package")]
    InvalidPackage,
    /// An upload could not be stored in the files directory.
    #[display("unable to store upload: {}", _0.display())]
    Upload(#[error(not(source))] PathBuf),
    /// The artifact store failed.
    #[display("artifact storage failed")]
    Storage,
    /// The record database failed.
    #[display("media records failed")]
    Records,
    /// A blocking storage task panicked or was cancelled.
    #[display("storage task failed")]
    Task,
}

impl ErrorKind {
    /// Lift a storage error, keeping an invalid package distinguishable.
    #[track_caller]
    pub fn storage(err: StorageError) -> Error {
        match &*err {
            StorageErrorKind::InvalidArchive(_) => err.raise(Self::InvalidPackage),
            _ => err.raise(Self::Storage),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Records | Self::Upload(_))
    }
}

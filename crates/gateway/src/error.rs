//! Gateway Error Types
//!
//! Every kind is answered with the same status (404) so that a client cannot
//! tell which check rejected it; only the plain-text reason differs.

use derive_more::{Display, Error};

/// A gateway error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The artifact identifier is not 40 hexadecimal characters.
    #[display("invalid content identifier")]
    InvalidIdentifier,
    /// The requested path contains a traversal segment.
    #[display("invalid file path")]
    InvalidPath,
    /// Nothing servable exists at the requested path.
    #[display("file not found")]
    NotFound,
    /// The requested path resolves outside its artifact directory.
    #[display("access denied")]
    AccessDenied,
    /// The file exists but could not be read.
    #[display("unable to read file")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }

    /// Body of the 404 response sent for this rejection.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "Invalid content identifier",
            Self::InvalidPath => "Invalid file path",
            Self::NotFound | Self::Io => "File not found",
            Self::AccessDenied => "Access denied",
        }
    }
}

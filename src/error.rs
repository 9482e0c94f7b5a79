//! Application Error Types
//!
//! Structured errors using `exn`; `main` renders the whole error tree through
//! `miette`.

use derive_more::{Display, Error};
use std::net::SocketAddr;
use std::path::PathBuf;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("unable to load configuration")]
    Config,
    #[display("unable to open media database")]
    Database,
    #[display("unable to prepare directory: {}", _0.display())]
    Directory(#[error(not(source))] PathBuf),
    #[display("media operation failed")]
    Library,
    #[display("not a course package: {}", _0.display())]
    NotCoursePackage(#[error(not(source))] PathBuf),
    #[display("media not found: {_0}")]
    NotFound(#[error(not(source))] u64),
    #[display("unable to listen on {_0}")]
    Bind(#[error(not(source))] SocketAddr),
    #[display("server error")]
    Serve,
}

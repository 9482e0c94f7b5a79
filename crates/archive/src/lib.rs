//! Validation and extraction of zip-packaged course archives (`.elpx`).
//!
//! - [`validate`] decides, without side effects, whether a file is plausibly
//!   a course package (a zip archive containing one of the [`MARKERS`]).
//! - [`Extractor`] unpacks an archive into a destination directory, keeping
//!   every entry inside it and optionally enforcing a total size limit.

pub mod error;
mod extract;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod validate;

pub use crate::extract::{Extractor, Summary, extract};
pub use crate::validate::{MARKERS, find_marker, validate};

//! Server-side storage of extracted course packages.
//!
//! Each media record that holds a course package may have one *artifact*: a
//! directory under the artifact base, named by a random [`Token`], containing
//! the unpacked archive. The token and whether the artifact has an
//! `index.html` are persisted in the record's metadata map (see
//! [`ArtifactMeta`]).

pub mod error;
mod record;
mod store;
mod sweep;
mod token;

pub use crate::record::{
    ArtifactMeta, COURSE_EXTENSIONS, HASH_KEY, MediaData, MediaRecord, PREVIEW_KEY, TEACHER_MODE_KEY, ViewerOptions,
};
pub use crate::store::{ArtifactStore, ORIGINALS_DIR, PREVIEW_ENTRY, Processed};
pub use crate::sweep::{ACCESS_MARKER, ensure_access_denied, remove_dir_best_effort};
pub use crate::token::Token;

//! Media lifecycle for course packages.
//!
//! [`Library`] is what a host calls from its media hooks: on create
//! ([`import`](Library::import)), on show ([`hydrate`](Library::hydrate)), on
//! delete ([`delete`](Library::delete)), and from the save and status
//! endpoints. [`Routes`] builds the URLs those endpoints hand out.

pub mod error;
mod media;
mod routes;

pub use crate::media::{Library, MediaStatus, Saved};
pub use crate::routes::Routes;

//! SQLite persistence for media records.
//!
//! The database is the host side of the storage layer: it owns every media
//! record's lifecycle and persists the metadata map the artifact store merges
//! its keys into. Artifacts themselves only live on disk.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::repo::Repository;

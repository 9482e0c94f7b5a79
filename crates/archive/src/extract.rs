use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::instrument;
use zip::ZipArchive;

/// Totals collected while unpacking an archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Regular files written.
    pub files: usize,
    /// Directory entries created.
    pub directories: usize,
    /// Entries dropped because their name would escape the destination.
    pub skipped: usize,
    /// Uncompressed bytes written.
    pub bytes: u64,
}

/// Unpacks zip archives into a destination directory.
///
/// The extractor does not validate that the archive is a course package; see
/// [`validate`](crate::validate) for that. Entry paths are preserved relative
/// to the destination, except for entries whose names are absolute or climb
/// out with `..`, which are skipped. Symbolic link entries are written as
/// regular files containing the link target, so nothing extracted ever points
/// outside the destination.
///
/// Extraction is **not** idempotent: always extract into a freshly named,
/// previously nonexistent directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct Extractor {
    size_limit: Option<u64>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort extraction once the total uncompressed output exceeds `limit`
    /// bytes. Declared entry sizes are not trusted; the limit applies to the
    /// bytes actually written.
    pub fn with_size_limit(mut self, limit: impl Into<Option<u64>>) -> Self {
        self.size_limit = limit.into();
        self
    }

    /// Extract every entry of `archive` into `destination`, creating the
    /// destination (and its parents) first.
    ///
    /// On failure the destination may contain a partial extraction; removing
    /// it is the caller's responsibility.
    #[instrument(skip(self), fields(archive = %archive.display(), destination = %destination.display()))]
    pub fn extract(&self, archive: &Path, destination: &Path) -> Result<Summary> {
        fs::create_dir_all(destination).or_raise(|| ErrorKind::CreateDir(destination.to_path_buf()))?;

        let file = File::open(archive).or_raise(|| ErrorKind::Open)?;
        let mut zip = ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::Open)?;

        let mut summary = Summary::default();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).or_raise(|| ErrorKind::Read)?;
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!(entry = entry.name(), "Skipping archive entry that escapes the destination");
                summary.skipped += 1;
                continue;
            };
            let target = destination.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target).or_raise(|| ErrorKind::CreateDir(target.clone()))?;
                summary.directories += 1;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).or_raise(|| ErrorKind::CreateDir(parent.to_path_buf()))?;
            }

            let mut output = File::create(&target).or_raise(|| ErrorKind::Write(target.clone()))?;
            let written = match self.size_limit {
                Some(limit) => {
                    let remaining = limit.saturating_sub(summary.bytes);
                    // Read one byte past the budget so that overflowing it is detectable.
                    let mut bounded = (&mut entry).take(remaining.saturating_add(1));
                    let written = io::copy(&mut bounded, &mut output).or_raise(|| ErrorKind::Write(target.clone()))?;
                    if written > remaining {
                        tracing::warn!(limit, "Archive expands beyond the configured size limit");
                        exn::bail!(ErrorKind::TooLarge(limit));
                    }
                    written
                },
                None => io::copy(&mut entry, &mut output).or_raise(|| ErrorKind::Write(target.clone()))?,
            };
            summary.bytes = summary.bytes.saturating_add(written);
            summary.files += 1;
        }

        tracing::info!(
            files = summary.files,
            directories = summary.directories,
            skipped = summary.skipped,
            bytes = summary.bytes,
            "Archive extracted"
        );
        Ok(summary)
    }
}

/// Extract `archive` into `destination` with no size limit.
pub fn extract(archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<Summary> {
    Extractor::new().extract(archive.as_ref(), destination.as_ref())
}

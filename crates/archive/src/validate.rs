use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use zip::ZipArchive;

/// Entry names that mark an archive as a course package. Matched exactly and
/// case-sensitively against the archive's entry names; only one is required.
pub const MARKERS: [&str; 3] = ["contentv3.xml", "content.xml", "index.html"];

/// Decide whether the file at `path` is plausibly a course package.
///
/// Fails closed: a missing file, a file that isn't a zip archive, or an archive
/// that contains none of the [`MARKERS`] all return `false`. There is no
/// validation of content beyond the presence of a marker entry.
///
/// # Examples
///
/// ```no_run
/// if !elpx_archive::validate("/tmp/upload.elpx") {
///     println!("not a course package");
/// }
/// ```
pub fn validate(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match find_marker(path) {
        Ok(Some(marker)) => {
            tracing::debug!(path = %path.display(), marker, "Archive contains course marker");
            true
        },
        Ok(None) => {
            tracing::debug!(path = %path.display(), "Archive contains no course marker");
            false
        },
        Err(e) => {
            tracing::debug!(path = %path.display(), error = ?e, "Archive could not be opened for validation");
            false
        },
    }
}

/// Find the first marker entry present in the archive at `path`.
///
/// The archive handle is opened read-only and dropped on every exit path.
pub fn find_marker(path: impl AsRef<Path>) -> Result<Option<&'static str>> {
    let file = File::open(path.as_ref()).or_raise(|| ErrorKind::Open)?;
    let archive = ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::Open)?;
    let marker = MARKERS.into_iter().find(|marker| archive.file_names().any(|name| name == *marker));
    Ok(marker)
}

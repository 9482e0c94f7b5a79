//! Filesystem side effects that must never fail the operation that
//! triggers them.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

/// Name of the deny-all marker kept in the artifact base directory.
pub const ACCESS_MARKER: &str = ".htaccess";

const ACCESS_MARKER_CONTENTS: &str = r#"# Extracted course content must only be served through the content gateway,
# which applies the security headers. Deny all direct access.

<IfModule mod_authz_core.c>
    Require all denied
</IfModule>
<IfModule !mod_authz_core.c>
    Order deny,allow
    Deny from all
</IfModule>

<IfModule mod_rewrite.c>
    RewriteEngine On
    RewriteRule ^ - [F,L]
</IfModule>
"#;

/// Make sure `base` carries the deny-all marker.
///
/// Idempotent: an existing marker is left alone, a missing one (even in a base
/// directory that already existed) is written. Failure to write is logged and
/// otherwise ignored.
pub fn ensure_access_denied(base: &Path) {
    let marker = base.join(ACCESS_MARKER);
    if marker.is_file() {
        return;
    }
    match fs::write(&marker, ACCESS_MARKER_CONTENTS) {
        Ok(()) => tracing::info!(path = %marker.display(), "Created access-denial marker"),
        Err(e) => tracing::warn!(path = %marker.display(), error = %e, "Unable to create access-denial marker"),
    }
}

/// Delete `dir` and everything reachable beneath it.
///
/// Best-effort: entries that are already gone are ignored, and per-entry
/// failures are logged and counted rather than aborting the sweep. Symbolic
/// links are removed, never followed. Returns the number of entries that
/// could not be removed.
pub fn remove_dir_best_effort(dir: &Path) -> usize {
    let metadata = match fs::symlink_metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == IoErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Unable to inspect path for removal");
            return 1;
        },
    };
    if !metadata.is_dir() {
        return remove(dir, fs::remove_file(dir));
    }

    let mut failures = 0;
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(path = %dir.display(), error = %e, "Unable to read directory entry");
                        failures += 1;
                        continue;
                    },
                };
                let path = entry.path();
                // DirEntry::file_type() does not traverse symlinks.
                match entry.file_type() {
                    Ok(kind) if kind.is_dir() => failures += remove_dir_best_effort(&path),
                    _ => failures += remove(&path, fs::remove_file(&path)),
                }
            }
        },
        Err(e) if e.kind() == IoErrorKind::NotFound => return failures,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Unable to list directory for removal");
            failures += 1;
        },
    }
    failures + remove(dir, fs::remove_dir(dir))
}

fn remove(path: &Path, result: std::io::Result<()>) -> usize {
    match result {
        Ok(()) => 0,
        Err(e) if e.kind() == IoErrorKind::NotFound => 0,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unable to remove path");
            1
        },
    }
}

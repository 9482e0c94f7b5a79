//! Archive fixtures for tests.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write a zip archive to `path` containing `entries`.
///
/// Entry names ending in `/` become directory entries (their data is
/// ignored). Names are written verbatim, so fixtures can contain hostile
/// names such as `../escape.txt`.
pub fn write_zip(path: impl AsRef<Path>, entries: &[(&str, &[u8])]) -> Result<()> {
    write_zip_with_links(path, entries, &[])
}

/// Like [`write_zip`], followed by one symbolic link entry per
/// `(name, target)` pair in `links`.
pub fn write_zip_with_links(path: impl AsRef<Path>, entries: &[(&str, &[u8])], links: &[(&str, &str)]) -> Result<()> {
    let path = path.as_ref();
    let failed = || ErrorKind::Write(path.to_path_buf());
    let file = File::create(path).or_raise(failed)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).or_raise(failed)?;
            continue;
        }
        zip.start_file(*name, options).or_raise(failed)?;
        zip.write_all(data).or_raise(failed)?;
    }
    for (name, target) in links {
        zip.add_symlink(*name, *target, options).or_raise(failed)?;
    }
    zip.finish().or_raise(failed)?;
    Ok(())
}

use crate::error::{ErrorKind, Result};
use crate::record::{ArtifactMeta, MediaRecord};
use crate::sweep::{ensure_access_denied, remove_dir_best_effort};
use crate::token::Token;
use elpx_archive::Extractor;
use exn::ResultExt;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;

/// Entry whose presence at the artifact root makes it previewable.
pub const PREVIEW_ENTRY: &str = "index.html";
/// Subdirectory of the files path holding raw uploads.
pub const ORIGINALS_DIR: &str = "original";
// A collision in 160 random bits is not going to happen twice in a row.
const RESERVE_ATTEMPTS: usize = 3;

/// Result of extracting a package into a fresh artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Processed {
    pub token: Token,
    pub has_preview: bool,
    /// Artifact the record pointed at before. It is left on disk: remove it
    /// with [`ArtifactStore::remove_artifact`] once the updated record has
    /// been persisted.
    pub superseded: Option<Token>,
}

impl Processed {
    pub fn meta(&self) -> ArtifactMeta {
        ArtifactMeta {
            extracted_hash: Some(self.token.clone()),
            has_preview: self.has_preview,
        }
    }
}

/// Maps media records to their extracted artifacts on disk.
///
/// Layout:
/// ```text
/// <files>/original/<filename>     raw course package (owned by the host)
/// <base>/.htaccess                deny-all marker
/// <base>/<token>/...              one directory per extraction
/// ```
///
/// Every extraction writes into a newly created, uniquely named directory, so
/// concurrent extractions never collide and readers of an older artifact are
/// unaffected until it is explicitly removed. All operations are blocking;
/// async callers should run them on a blocking thread.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    base: PathBuf,
    files: PathBuf,
    extractor: Extractor,
}

impl ArtifactStore {
    /// # Arguments
    /// * `base` - directory that holds one subdirectory per artifact
    /// * `files` - the host's files directory (raw uploads live in `original/`)
    pub fn new(base: impl Into<PathBuf>, files: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            files: files.into(),
            extractor: Extractor::new(),
        }
    }

    /// Cap the total uncompressed size of every extraction.
    pub fn with_size_limit(mut self, limit: impl Into<Option<u64>>) -> Self {
        self.extractor = self.extractor.with_size_limit(limit);
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn originals(&self) -> PathBuf {
        self.files.join(ORIGINALS_DIR)
    }

    pub fn artifact_path(&self, token: &Token) -> PathBuf {
        self.base.join(token.as_str())
    }

    /// Canonical location of the record's raw file.
    ///
    /// The filename must be a single plain path component; anything else is
    /// reported as a missing source rather than resolved.
    pub fn source_path(&self, record: &MediaRecord) -> Result<PathBuf> {
        let mut components = Path::new(&record.filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.originals().join(name)),
            _ => exn::bail!(ErrorKind::SourceMissing(self.originals().join(&record.filename))),
        }
    }

    /// Current artifact token recorded on `record`.
    pub fn hash(record: &MediaRecord) -> Option<Token> {
        record.artifact().extracted_hash
    }

    /// Whether `record` is marked as having a previewable artifact.
    pub fn has_preview(record: &MediaRecord) -> bool {
        record.artifact().has_preview
    }

    /// Extract the record's stored raw file into a brand new artifact and
    /// merge the resulting token and preview flag into the record's metadata.
    ///
    /// Never validates the archive: a package without `index.html` is a
    /// legitimate outcome (no preview), not an error. Running it twice on the
    /// same file produces two distinct artifacts; the earlier one is reported
    /// as [`superseded`](Processed::superseded), not removed.
    #[instrument(skip_all, fields(media_id = record.id))]
    pub fn process(&self, record: &mut MediaRecord) -> Result<Processed> {
        let superseded = Self::hash(record);
        let source = self.source_path(record)?;
        if !source.is_file() {
            tracing::warn!(path = %source.display(), "Media file not found");
            exn::bail!(ErrorKind::SourceMissing(source));
        }
        let processed = self.extract_fresh(&source, superseded)?;
        processed.meta().write_into(&mut record.data);
        tracing::info!(token = %processed.token, has_preview = processed.has_preview, "Media processed");
        Ok(processed)
    }

    /// Replace the record's raw file with `new_file` and re-extract it.
    ///
    /// The replacement is staged: the new file is copied next to the
    /// canonical one and extracted into a fresh artifact first. Only once that
    /// succeeded is it renamed over the canonical file and the metadata
    /// updated. Any earlier failure leaves the original file, the old artifact
    /// and the metadata exactly as they were. The old artifact is never
    /// removed here; it is returned as [`superseded`](Processed::superseded).
    #[instrument(skip_all, fields(media_id = record.id, new_file = %new_file.display()))]
    pub fn replace_file(&self, record: &mut MediaRecord, new_file: &Path) -> Result<Processed> {
        let superseded = Self::hash(record);
        let original = self.source_path(record)?;

        if !elpx_archive::validate(new_file) {
            tracing::info!("Rejected replacement that is not a course package");
            exn::bail!(ErrorKind::InvalidArchive(new_file.to_path_buf()));
        }

        let originals = self.originals();
        fs::create_dir_all(&originals).or_raise(|| ErrorKind::Copy(original.clone()))?;
        let staged = originals.join(format!(".{}.{}.staged", record.filename, Token::generate(new_file)));
        if let Err(e) = fs::copy(new_file, &staged) {
            discard_file(&staged);
            return Err(e).or_raise(|| ErrorKind::Copy(original));
        }

        let processed = match self.extract_fresh(&staged, superseded) {
            Ok(processed) => processed,
            Err(e) => {
                discard_file(&staged);
                return Err(e);
            },
        };

        if let Err(e) = fs::rename(&staged, &original) {
            discard_file(&staged);
            remove_dir_best_effort(&self.artifact_path(&processed.token));
            return Err(e).or_raise(|| ErrorKind::Copy(original));
        }
        processed.meta().write_into(&mut record.data);
        tracing::info!(token = %processed.token, has_preview = processed.has_preview, "Media file replaced");
        Ok(processed)
    }

    /// Remove the record's artifact, if it has one.
    ///
    /// A record with no token is a no-op; an artifact that is already gone
    /// counts as cleaned. Never fails.
    #[instrument(skip_all, fields(media_id = record.id))]
    pub fn cleanup(&self, record: &MediaRecord) {
        if let Some(token) = Self::hash(record) {
            self.remove_artifact(&token);
        }
    }

    /// Remove one artifact directory, best-effort. Never fails.
    pub fn remove_artifact(&self, token: &Token) {
        let path = self.artifact_path(token);
        match remove_dir_best_effort(&path) {
            0 => tracing::info!(token = %token, "Removed artifact"),
            failures => tracing::warn!(token = %token, failures, "Artifact only partially removed"),
        }
    }

    fn extract_fresh(&self, source: &Path, superseded: Option<Token>) -> Result<Processed> {
        fs::create_dir_all(&self.base).or_raise(|| ErrorKind::Extraction)?;
        ensure_access_denied(&self.base);

        let (token, destination) = self.reserve(source)?;
        if let Err(e) = self.extractor.extract(source, &destination) {
            remove_dir_best_effort(&destination);
            return Err(e).or_raise(|| ErrorKind::Extraction);
        }
        let has_preview = destination.join(PREVIEW_ENTRY).is_file();
        Ok(Processed {
            superseded: superseded.filter(|previous| *previous != token),
            token,
            has_preview,
        })
    }

    /// Create a previously nonexistent artifact directory.
    fn reserve(&self, source: &Path) -> Result<(Token, PathBuf)> {
        for _ in 0..RESERVE_ATTEMPTS {
            let token = Token::generate(source);
            let destination = self.artifact_path(&token);
            match fs::create_dir(&destination) {
                Ok(()) => return Ok((token, destination)),
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e).or_raise(|| ErrorKind::Extraction),
            }
        }
        exn::bail!(ErrorKind::Extraction)
    }
}

fn discard_file(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != IoErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "Unable to remove staged file");
    }
}

use crate::error::{ErrorKind, Result};
use crate::routes::Routes;
use elpx_records::Repository;
use elpx_storage::{ArtifactStore, MediaData, MediaRecord, Processed, Token, ViewerOptions};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Read-only summary of a media record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaStatus {
    pub id: u64,
    /// Download URL of the raw file.
    pub url: String,
    /// Name the file was uploaded under.
    pub title: String,
    /// Stored name of the raw file.
    pub filename: String,
    pub has_preview: bool,
    pub preview_url: Option<String>,
}

/// Outcome of replacing a record's file.
#[derive(Clone, Debug)]
pub struct Saved {
    pub record: MediaRecord,
    pub processed: Processed,
    pub preview_url: Option<String>,
}

/// Media lifecycle: ties the record database to the artifact store.
///
/// Hooks only act on course packages (see
/// [`MediaRecord::is_course_package`]); other media pass through untouched.
/// Blocking store operations run on Tokio's blocking pool.
#[derive(Clone, Debug)]
pub struct Library {
    store: ArtifactStore,
    records: Repository,
    routes: Routes,
}

impl Library {
    pub fn new(store: ArtifactStore, records: Repository, routes: Routes) -> Self {
        Self { store, records, routes }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn records(&self) -> &Repository {
        &self.records
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Fetch a record, raising [`ErrorKind::NotFound`] when absent.
    pub async fn get(&self, id: u64) -> Result<MediaRecord> {
        self.records
            .get(id)
            .await
            .or_raise(|| ErrorKind::Records)?
            .ok_or_raise(|| ErrorKind::NotFound(id))
    }

    async fn persist(&self, record: &MediaRecord) -> Result<()> {
        self.records.save_data(record).await.or_raise(|| ErrorKind::Records)
    }

    /// Persist a record that now points at `processed`, then drop the
    /// artifact it superseded.
    ///
    /// If the record cannot be written, the stored record still points at the
    /// superseded artifact: that one is kept and the new one removed instead.
    async fn commit(&self, record: &MediaRecord, processed: &Processed) -> Result<()> {
        if let Err(e) = self.persist(record).await {
            tracing::warn!(media_id = record.id, token = %processed.token, "Discarding artifact of unsaved record");
            self.remove_artifact(processed.token.clone()).await;
            return Err(e);
        }
        if let Some(superseded) = &processed.superseded {
            self.remove_artifact(superseded.clone()).await;
        }
        Ok(())
    }

    async fn remove_artifact(&self, token: Token) {
        let store = self.store.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || store.remove_artifact(&token)).await {
            tracing::warn!(error = %e, "Artifact removal task failed");
        }
    }

    /// Run `process` for `record` on the blocking pool.
    async fn process(&self, record: MediaRecord) -> Result<(MediaRecord, elpx_storage::error::Result<Processed>)> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let mut record = record;
            let result = store.process(&mut record);
            (record, result)
        })
        .await
        .or_raise(|| ErrorKind::Task)
    }

    /// Store an uploaded file as new media.
    ///
    /// The upload is copied to `<files>/original/<random>.<ext>` and recorded
    /// under `source_name`. Course packages are then extracted right away; an
    /// extraction failure is logged and leaves the record without a preview.
    #[instrument(skip(self), fields(upload = %upload.display()))]
    pub async fn import(&self, upload: &Path, source_name: &str) -> Result<MediaRecord> {
        let filename = match Path::new(source_name).extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", Token::generate(upload), ext.to_ascii_lowercase()),
            None => Token::generate(upload).to_string(),
        };
        let originals = self.store.originals();
        let destination = originals.join(&filename);
        tokio::fs::create_dir_all(&originals)
            .await
            .or_raise(|| ErrorKind::Upload(originals.clone()))?;
        tokio::fs::copy(upload, &destination)
            .await
            .or_raise(|| ErrorKind::Upload(destination.clone()))?;

        let record = match self.records.insert(&filename, source_name, &MediaData::new()).await {
            Ok(record) => record,
            Err(e) => {
                discard(&destination).await;
                return Err(e.raise(ErrorKind::Records));
            },
        };
        tracing::info!(media_id = record.id, filename = %filename, "Imported media");
        if !record.is_course_package() {
            return Ok(record);
        }
        self.extract_for_preview(record).await
    }

    /// Load a record for display, extracting it first if it has no usable
    /// artifact yet. Extraction failures are logged; the record is returned
    /// without a preview.
    #[instrument(skip(self))]
    pub async fn hydrate(&self, id: u64) -> Result<MediaRecord> {
        let record = self.get(id).await?;
        let artifact = record.artifact();
        if !record.is_course_package() || artifact.preview().is_some() {
            return Ok(record);
        }
        self.extract_for_preview(record).await
    }

    async fn extract_for_preview(&self, record: MediaRecord) -> Result<MediaRecord> {
        let id = record.id;
        let (record, result) = self.process(record).await?;
        match result {
            Ok(processed) => self.commit(&record, &processed).await?,
            Err(e) => tracing::warn!(media_id = id, error = ?e, "Unable to extract course package"),
        }
        Ok(record)
    }

    /// Extract the record's raw file into a new artifact unconditionally,
    /// then remove the artifact it supersedes.
    #[instrument(skip(self))]
    pub async fn reprocess(&self, id: u64) -> Result<MediaRecord> {
        let record = self.get(id).await?;
        let (record, result) = self.process(record).await?;
        let processed = result.map_err(ErrorKind::storage)?;
        self.commit(&record, &processed).await?;
        Ok(record)
    }

    /// Replace a record's raw file with `upload` and re-extract it.
    ///
    /// Raises [`ErrorKind::InvalidPackage`] if `upload` is not a course
    /// package, in which case nothing changes. If the updated record cannot
    /// be written, the raw file has already been replaced but the stored
    /// record keeps pointing at, and serving, the previous artifact.
    #[instrument(skip(self), fields(upload = %upload.display()))]
    pub async fn save(&self, id: u64, upload: &Path) -> Result<Saved> {
        let record = self.get(id).await?;
        let store = self.store.clone();
        let upload = upload.to_path_buf();
        let (record, result) = tokio::task::spawn_blocking(move || {
            let mut record = record;
            let result = store.replace_file(&mut record, &upload);
            (record, result)
        })
        .await
        .or_raise(|| ErrorKind::Task)?;
        let processed = result.map_err(ErrorKind::storage)?;
        self.commit(&record, &processed).await?;
        let preview_url = self.routes.preview(&record);
        Ok(Saved {
            record,
            processed,
            preview_url,
        })
    }

    pub async fn status(&self, id: u64) -> Result<MediaStatus> {
        let record = self.get(id).await?;
        Ok(MediaStatus {
            id: record.id,
            url: self.routes.file(record.id),
            title: record.source.clone(),
            filename: record.filename.clone(),
            has_preview: ArtifactStore::has_preview(&record),
            preview_url: self.routes.preview(&record),
        })
    }

    pub async fn list(&self) -> Result<Vec<MediaRecord>> {
        self.records.list().await.or_raise(|| ErrorKind::Records)
    }

    /// Record and on-disk location of the raw file.
    pub async fn file(&self, id: u64) -> Result<(MediaRecord, PathBuf)> {
        let record = self.get(id).await?;
        let path = self.store.source_path(&record).map_err(ErrorKind::storage)?;
        Ok((record, path))
    }

    pub async fn set_teacher_mode_visible(&self, id: u64, raw: &str) -> Result<MediaRecord> {
        let mut record = self.get(id).await?;
        ViewerOptions::from_form_value(raw).write_into(&mut record.data);
        self.persist(&record).await?;
        Ok(record)
    }

    /// Delete a record together with its artifact and raw file.
    ///
    /// Returns `false` if there was no such record. Removing files is
    /// best-effort and never prevents the record from being deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<bool> {
        let Some(record) = self.records.get(id).await.or_raise(|| ErrorKind::Records)? else {
            return Ok(false);
        };
        if record.is_course_package() {
            let store = self.store.clone();
            let removed = record.clone();
            tokio::task::spawn_blocking(move || store.cleanup(&removed))
                .await
                .or_raise(|| ErrorKind::Task)?;
        }
        if let Ok(path) = self.store.source_path(&record) {
            discard(&path).await;
        }
        let deleted = self.records.delete(id).await.or_raise(|| ErrorKind::Records)?;
        tracing::info!(media_id = id, "Deleted media");
        Ok(deleted)
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "Unable to remove raw file");
    }
}

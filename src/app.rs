use crate::error::{ErrorKind, Result};
use elpx_config::Config;
use elpx_gateway::ContentGateway;
use elpx_library::{Library, Routes};
use elpx_records::{Database, Repository};
use elpx_storage::ArtifactStore;
use exn::ResultExt;
use std::path::Path;

/// Services wired together from a [`Config`].
#[derive(Clone, Debug)]
pub struct App {
    pub db: Database,
    pub library: Library,
    pub gateway: ContentGateway,
}

impl App {
    pub async fn open(config: &Config) -> Result<Self> {
        let storage = &config.storage;
        if let Some(parent) = config.database.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            create_dir(parent).await?;
        }
        create_dir(&storage.files).await?;

        let db = Database::connect(&config.database.path).await.or_raise(|| ErrorKind::Database)?;
        let store =
            ArtifactStore::new(&storage.artifacts, &storage.files).with_size_limit(storage.extraction_limit());
        let library = Library::new(store, Repository::from(&db), Routes::new(config.server.public_prefix.as_str()));
        let gateway = ContentGateway::new(&storage.artifacts);
        tracing::debug!(
            files = %storage.files.display(),
            artifacts = %storage.artifacts.display(),
            database = %config.database.path.display(),
            "Opened media library"
        );
        Ok(Self { db, library, gateway })
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .or_raise(|| ErrorKind::Directory(path.to_path_buf()))
}

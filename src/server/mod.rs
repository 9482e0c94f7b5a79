//! HTTP surface: content delivery and the media API.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /content/{hash}[/{*path}]` | [`ContentGateway::serve`] |
//! | `POST /api/save/{id}` | replace a course's file (multipart field `file`) |
//! | `GET /api/data/{id}` | media status |
//! | `GET /api/file/{id}` | raw file download |

mod api;
mod content;

use crate::error::{ErrorKind, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use elpx_gateway::ContentGateway;
use elpx_library::Library;
use exn::ResultExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct AppState {
    pub library: Library,
    pub gateway: ContentGateway,
    /// Bearer token the save endpoint requires, if any.
    pub api_token: Option<String>,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState, upload_limit: usize) -> Router {
    Router::new()
        .route("/content/{hash}", get(content::root))
        .route("/content/{hash}/", get(content::root))
        .route("/content/{hash}/{*path}", get(content::file))
        .route("/api/save/{id}", post(api::save).fallback(api::method_not_allowed))
        .route("/api/data/{id}", get(api::data))
        .route("/api/file/{id}", get(api::file))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

pub async fn serve(state: SharedState, listen: SocketAddr, upload_limit: usize) -> Result<()> {
    let listener = TcpListener::bind(listen).await.or_raise(|| ErrorKind::Bind(listen))?;
    tracing::info!(%listen, "Listening");
    axum::serve(listener, router(state, upload_limit))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .or_raise(|| ErrorKind::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use elpx_archive::testing::write_zip;
    use elpx_library::Routes;
    use elpx_records::{Database, Repository};
    use elpx_storage::{ArtifactStore, MediaRecord};
    use std::path::PathBuf;
    use tempfile::TempDir;

    pub struct Fixture {
        pub dir: TempDir,
        pub state: SharedState,
    }

    impl Fixture {
        pub async fn new(api_token: Option<&str>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let artifacts = dir.path().join("artifacts");
            let store = ArtifactStore::new(&artifacts, dir.path().join("files"));
            let db = Database::connect_in_memory().await.unwrap();
            let state = Arc::new(AppState {
                library: Library::new(store, Repository::from(&db), Routes::default()),
                gateway: ContentGateway::new(&artifacts),
                api_token: api_token.map(str::to_string),
            });
            Self { dir, state }
        }

        pub fn zip(&self, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
            let path = self.dir.path().join(name);
            write_zip(&path, entries).unwrap();
            path
        }

        pub async fn course(&self, entries: &[(&str, &[u8])]) -> MediaRecord {
            let upload = self.zip("import.tmp", entries);
            self.state.library.import(&upload, "Course.elpx").await.unwrap()
        }
    }
}

use crate::app::App;
use crate::error::{ErrorKind, Result};
use crate::server::{self, AppState};
use clap::{Parser, Subcommand};
use elpx_config::Config;
use elpx_storage::{ArtifactStore, MediaRecord};
use exn::ResultExt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "elpx", version, about = "Store, unpack and securely serve zip-packaged e-learning courses")]
pub struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(long, short, global = true, env = "ELPX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve extracted content and the media API over HTTP
    Serve {
        /// Overrides `server.listen`
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Import a file as new media, extracting it if it is a course package
    Import {
        file: PathBuf,
        /// Title to record (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Check whether a file is a course package
    Validate { file: PathBuf },
    /// Extract a media record's course package again
    Process { id: u64 },
    /// Show one or all media records
    Status { id: Option<u64> },
    /// Delete a media record, its artifact and its raw file
    Delete { id: u64 },
    /// Show or hide the teacher-mode toggler of a course (`1`/`0`)
    TeacherMode { id: u64, visible: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if let Command::Validate { file } = &self.command {
            return validate(file);
        }
        let mut config = Config::load(self.config.as_deref()).or_raise(|| ErrorKind::Config)?;
        let app = App::open(&config).await?;
        let result = match self.command {
            Command::Serve { listen } => {
                if let Some(listen) = listen {
                    config.server.listen = listen;
                }
                serve(&app, &config).await
            },
            Command::Import { file, name } => import(&app, &file, name).await,
            Command::Process { id } => {
                let record = app.library.reprocess(id).await.or_raise(|| ErrorKind::Library)?;
                print_record(&app, &record);
                Ok(())
            },
            Command::Status { id: Some(id) } => {
                let record = app.library.get(id).await.or_raise(|| ErrorKind::Library)?;
                print_record(&app, &record);
                Ok(())
            },
            Command::Status { id: None } => {
                for record in app.library.list().await.or_raise(|| ErrorKind::Library)? {
                    print_record(&app, &record);
                }
                Ok(())
            },
            Command::Delete { id } => {
                if !app.library.delete(id).await.or_raise(|| ErrorKind::Library)? {
                    exn::bail!(ErrorKind::NotFound(id));
                }
                println!("deleted {id}");
                Ok(())
            },
            Command::TeacherMode { id, visible } => {
                let record = app
                    .library
                    .set_teacher_mode_visible(id, &visible)
                    .await
                    .or_raise(|| ErrorKind::Library)?;
                print_record(&app, &record);
                Ok(())
            },
            Command::Validate { .. } => Ok(()),
        };
        app.close().await;
        result
    }
}

fn validate(file: &Path) -> Result<()> {
    match elpx_archive::find_marker(file) {
        Ok(Some(marker)) => {
            println!("{}: course package ({marker})", file.display());
            Ok(())
        },
        Ok(None) => exn::bail!(ErrorKind::NotCoursePackage(file.to_path_buf())),
        Err(e) => Err(e.raise(ErrorKind::NotCoursePackage(file.to_path_buf()))),
    }
}

async fn import(app: &App, file: &Path, name: Option<String>) -> Result<()> {
    let name = name
        .or_else(|| file.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "upload".to_string());
    let record = app.library.import(file, &name).await.or_raise(|| ErrorKind::Library)?;
    print_record(app, &record);
    Ok(())
}

async fn serve(app: &App, config: &Config) -> Result<()> {
    if config.server.api_token.is_none() {
        tracing::warn!("No API token configured: the save endpoint accepts unauthenticated uploads");
    }
    let state = Arc::new(AppState {
        library: app.library.clone(),
        gateway: app.gateway.clone(),
        api_token: config.server.api_token.clone(),
    });
    server::serve(state, config.server.listen, config.server.upload_limit).await
}

fn print_record(app: &App, record: &MediaRecord) {
    let preview = app.library.routes().preview(record).unwrap_or_else(|| "-".to_string());
    let hash = ArtifactStore::hash(record).map(|token| token.to_string()).unwrap_or_else(|| "-".to_string());
    println!("{}\t{}\t{}\t{}\t{}", record.id, record.source, record.filename, hash, preview);
}

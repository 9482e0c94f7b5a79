//! Layered configuration for elpx.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults,
//! 2. `<config dir>/elpx.toml`, if it exists,
//! 3. an explicit file (`.toml`, `.yaml`/`.yml` or `.json`),
//! 4. `ELPX_` environment variables, nested with `__`
//!    (`ELPX_SERVER__LISTEN=0.0.0.0:8080`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "ELPX_";
pub const CONFIG_FILE: &str = "elpx.toml";
const DEFAULT_PORT: u16 = 8080;
const GIB: u64 = 1024 * 1024 * 1024;
const MIB: usize = 1024 * 1024;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "elpx", "elpx")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Files directory; raw uploads live in its `original/` subdirectory.
    pub files: PathBuf,
    /// Base directory of extracted artifacts.
    pub artifacts: PathBuf,
    /// Largest total uncompressed size an archive may extract to, in bytes.
    /// `0` disables the limit.
    pub max_extracted_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            files: data.join("files"),
            artifacts: data.join("artifacts"),
            max_extracted_size: GIB,
        }
    }
}

impl StorageConfig {
    pub fn extraction_limit(&self) -> Option<u64> {
        Some(self.max_extracted_size).filter(|limit| *limit > 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("media.sqlite"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Bearer token required by the save endpoint. Unset leaves it open.
    pub api_token: Option<String>,
    /// Largest accepted request body, in bytes.
    pub upload_limit: usize,
    /// Prepended to every generated URL.
    pub public_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            api_token: None,
            upload_limit: 256 * MIB,
            public_prefix: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load from every standard source, plus `explicit` if given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut loader = Loader::new();
        if let Some(path) = explicit {
            loader = loader.explicit(path);
        }
        loader.load()
    }

    /// Reject configurations the services cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.files.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("storage.files must not be empty".to_string()));
        }
        if self.storage.artifacts.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("storage.artifacts must not be empty".to_string()));
        }
        if self.storage.files == self.storage.artifacts {
            exn::bail!(ErrorKind::Invalid(
                "storage.files and storage.artifacts must be different directories".to_string()
            ));
        }
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database.path must not be empty".to_string()));
        }
        if self.server.upload_limit == 0 {
            exn::bail!(ErrorKind::Invalid("server.upload_limit must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Assembles the figment for [`Config`].
#[derive(Clone, Debug)]
pub struct Loader {
    user_file: Option<PathBuf>,
    explicit: Option<PathBuf>,
    env: bool,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        Self {
            user_file: project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE)),
            explicit: None,
            env: true,
        }
    }

    /// Replace the per-user config file (`None` skips it).
    pub fn user_file(mut self, path: Option<PathBuf>) -> Self {
        self.user_file = path;
        self
    }

    pub fn explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    pub fn env(mut self, enabled: bool) -> Self {
        self.env = enabled;
        self
    }

    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = &self.user_file {
            // Missing user files are skipped by the provider.
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = &self.explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::MissingFile(path.clone()));
            }
            let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.clone())),
            };
            tracing::debug!(path = %path.display(), "Using config file");
        }
        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        Ok(figment)
    }

    /// Merge all sources, extract and validate.
    pub fn load(&self) -> Result<Config> {
        let config: Config = self.figment()?.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }
}

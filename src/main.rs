mod app;
mod cli;
mod error;
mod server;

use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "elpx=info,elpx_archive=info,elpx_storage=info,elpx_gateway=info,elpx_library=info";

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with_writer(std::io::stderr)
        .init();

    cli::Cli::parse().run().await.map_err(|e| miette::miette!("{e:?}"))
}

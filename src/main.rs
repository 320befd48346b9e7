use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use valley_legend::persist::FileSaveStore;
use valley_legend::server::{self, ServerConfig};

#[derive(Debug, Parser)]
#[command(author, version, about = "Valley Legend session server")]
struct Cli {
    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8460)]
    port: u16,

    /// Directory for save documents (defaults to ~/.valley-legend/data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Fix the session RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        data_dir: cli.data_dir.unwrap_or_else(FileSaveStore::default_dir),
        seed: cli.seed,
    };
    server::run(config).await
}

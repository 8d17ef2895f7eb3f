//! MediaDrop uploader entry point.

mod app;
mod config;
mod display;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Upload media files to a MediaDrop server in chunks.
#[derive(Debug, Parser)]
#[command(name = "mediadrop", version, about, long_about = None)]
pub struct Cli {
    /// Files to upload, in order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Destination directory on the server, relative to its media root.
    #[arg(short, long)]
    pub directory: Option<String>,

    /// Server base URL (overrides the config file).
    #[arg(short, long)]
    pub server: Option<String>,

    /// CSRF token (overrides the config file).
    #[arg(long)]
    pub csrf_token: Option<String>,

    /// Chunk size in MiB (overrides the config file).
    #[arg(long)]
    pub chunk_size_mib: Option<u64>,

    /// Path to the config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Quiet by default; the progress bars report routine progress.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting MediaDrop uploader"
    );

    let mut config = config::Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    tracing::info!(server = %config.server_url, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli, config))
}

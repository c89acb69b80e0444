//! chunkup entry point.

mod config;
mod progress;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chunkup_rest::{Client, MetadataMode};
use chunkup_upload::{UploadOptions, upload_chunked};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Uploads a file (or standard input) to a document library in chunks.
#[derive(Debug, Parser)]
#[command(name = "chunkup", version)]
struct Cli {
    /// File to upload, or `-` for standard input.
    source: String,

    /// Destination file name (defaults to the source file name).
    #[arg(short, long)]
    name: Option<String>,

    /// Configuration file (defaults to the platform config path).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Site URL, overriding the configuration.
    #[arg(long)]
    site_url: Option<String>,

    /// Destination folder (server-relative URL).
    #[arg(short, long)]
    folder: Option<String>,

    /// Bearer token.
    #[arg(long)]
    token: Option<String>,

    /// Chunk size in bytes (0 = default).
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Fail instead of replacing an existing file.
    #[arg(long)]
    no_overwrite: bool,

    /// Response metadata verbosity.
    #[arg(long, value_parser = parse_metadata_mode)]
    metadata: Option<MetadataMode>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.site_url {
            config.site_url = url.clone();
        }
        if let Some(folder) = &self.folder {
            config.folder = folder.clone();
        }
        if let Some(token) = &self.token {
            config.access_token = token.clone();
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if self.no_overwrite {
            config.overwrite = false;
        }
        if let Some(mode) = self.metadata {
            config.metadata = mode;
        }
    }

    fn is_stdin(&self) -> bool {
        self.source == "-"
    }

    /// Resolves the destination file name.
    fn destination_name(&self) -> anyhow::Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        if self.is_stdin() {
            anyhow::bail!("--name is required when reading from standard input");
        }
        Path::new(&self.source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("cannot derive a file name from {}", self.source))
    }
}

fn parse_metadata_mode(s: &str) -> Result<MetadataMode, String> {
    match s {
        "verbose" => Ok(MetadataMode::Verbose),
        "minimal" => Ok(MetadataMode::Minimal),
        "none" => Ok(MetadataMode::None),
        other => Err(format!("unknown metadata mode: {other}")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize structured logging.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting chunkup");

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, config))
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let name = cli.destination_name()?;
    let client = Client::new(&config.site_url, &config.access_token, config.metadata)?;
    let folder = client.folder(&config.folder);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling at the next checkpoint");
                cancel.cancel();
            }
        }
    });

    let total_bytes = if cli.is_stdin() {
        None
    } else {
        Some(tokio::fs::metadata(&cli.source).await?.len())
    };

    let options = UploadOptions::default()
        .with_overwrite(config.overwrite)
        .with_chunk_size(config.chunk_size)
        .with_progress(ProgressReporter::new(cancel, total_bytes));

    tracing::info!(
        source = %cli.source,
        name = %name,
        folder = %folder.path(),
        "uploading"
    );

    let metadata = if cli.is_stdin() {
        upload_chunked(&folder, &name, tokio::io::stdin(), &options).await?
    } else {
        let file = tokio::fs::File::open(&cli.source)
            .await
            .with_context(|| format!("opening {}", cli.source))?;
        upload_chunked(&folder, &name, file, &options).await?
    };

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

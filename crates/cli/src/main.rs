//! predator-cache command-line entry point.
//!
//! Thin operator tool over the cache library: inspect, seed and clear a cache
//! using the same configuration the scraper uses. Logging goes to stderr so
//! payloads written to stdout stay clean.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use predator_cache::{AllowFullTable, Cache, CacheConfig, request_key};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "predator-cache", version, about = "Inspect and manage a predator response cache")]
struct Cli {
    /// TOML configuration file (overrides PREDATOR_CACHE_CONFIG_FILE).
    #[arg(long, global = true, env = "PREDATOR_CACHE_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Force payload compression on, whatever the configuration says.
    #[arg(long, global = true)]
    compressed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect and create the schema if needed.
    Init,

    /// Print the payload cached under KEY.
    Get {
        key: String,

        /// Write the payload to this file instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Cache the contents of FILE (or stdin with `-`) under KEY.
    Put { key: String, file: PathBuf },

    /// Delete every cached entry.
    Clear {
        /// Confirm the full-table delete.
        #[arg(long)]
        yes: bool,
    },

    /// Print the cache key for a request.
    Key {
        url: String,

        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        #[arg(long, short = 'd', default_value = "")]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Key { url, method, body } => {
            println!("{}", request_key(&method, &url, body.as_bytes()));
        }
        Command::Init => {
            let (config, _cache) = open_cache(cli.config.as_deref(), cli.compressed).await?;
            eprintln!("cache ready ({} backend)", config.backend.kind());
        }
        Command::Get { key, out } => {
            let (_, cache) = open_cache(cli.config.as_deref(), cli.compressed).await?;
            let Some(payload) = cache.lookup(&key).await? else {
                eprintln!("miss: {key}");
                return Ok(ExitCode::FAILURE);
            };
            match out {
                Some(path) => tokio::fs::write(&path, &payload)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&payload).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Put { key, file } => {
            let payload = read_input(&file).await?;
            let (_, cache) = open_cache(cli.config.as_deref(), cli.compressed).await?;
            cache.store(&key, &payload).await?;
            tracing::info!(key = %key, bytes = payload.len(), "stored");
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every entry without --yes");
            }
            let (_, cache) = open_cache(cli.config.as_deref(), cli.compressed).await?;
            let deleted = cache.clear(AllowFullTable).await?;
            eprintln!("deleted {deleted} entries");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn open_cache(file: Option<&Path>, compressed: bool) -> Result<(CacheConfig, Arc<dyn Cache>)> {
    let mut config = CacheConfig::load_with_file(file).context("loading cache configuration")?;
    if compressed {
        config.compressed = true;
    }
    let cache = predator_cache::open(&config).await.context("opening cache")?;
    Ok((config, cache))
}

async fn read_input(file: &Path) -> Result<Vec<u8>> {
    if file.as_os_str() == "-" {
        let mut payload = Vec::new();
        tokio::io::stdin().read_to_end(&mut payload).await?;
        return Ok(payload);
    }
    tokio::fs::read(file).await.with_context(|| format!("reading {}", file.display()))
}

//! FiiScope CLI: fund lookups and cache management.
//!
//! Commands:
//! - `fetch`: resolve fields for one ticker and print the response as JSON
//! - `fields`: list every field name a request may ask for
//! - `cache status`: count fresh, stale and corrupt cache lines
//! - `cache wipe`: drop every cached response
//! - `cache invalidate`: drop the cached response for one request shape

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use fiiscope_core::data::{CacheStore, SourceSelector};
use fiiscope_core::domain::{FieldName, Ticker};
use fiiscope_core::{CacheMode, FiiService, Request, ScraperConfig};

#[derive(Parser)]
#[command(name = "fiiscope", about = "FiiScope CLI: real-estate fund data from public providers")]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache file, overriding the config.
    #[arg(long, global = true)]
    cache_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve fields for a ticker and print the response as JSON.
    Fetch {
        /// Fund ticker (e.g., MXRF11).
        ticker: String,

        /// Provider to consult: all, fundamentus, fundsexplorer, investidor10.
        #[arg(long, default_value = "all")]
        source: SourceSelector,

        /// Comma-separated field names. Defaults to every field.
        #[arg(long, default_value = "")]
        fields: String,

        /// use_cache, bypass_and_store, bypass_and_clear or delete_all_cache.
        #[arg(long, default_value = "use_cache")]
        cache_mode: CacheMode,
    },
    /// List every known field name.
    Fields,
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report line counts: fresh, stale, corrupt.
    Status,
    /// Remove every cached response.
    Wipe,
    /// Remove the cached response for one request shape.
    Invalidate {
        ticker: String,

        #[arg(long, default_value = "all")]
        source: SourceSelector,

        #[arg(long, default_value = "")]
        fields: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fiiscope=info,fiiscope_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.cache_file)?;

    match cli.command {
        Commands::Fetch {
            ticker,
            source,
            fields,
            cache_mode,
        } => run_fetch(&config, &ticker, source, &fields, cache_mode),
        Commands::Fields => {
            for field in FieldName::ALL {
                println!("{field}");
            }
            Ok(())
        }
        Commands::Cache { action } => {
            let cache = CacheStore::from_config(&config.cache);
            match action {
                CacheAction::Status => run_cache_status(&cache),
                CacheAction::Wipe => {
                    cache.wipe()?;
                    println!("Cache wiped: {}", cache.path().display());
                    Ok(())
                }
                CacheAction::Invalidate {
                    ticker,
                    source,
                    fields,
                } => {
                    let request = build_request(&ticker, source, &fields, CacheMode::UseCache)?;
                    let removed = cache.invalidate(&request.cache_key())?;
                    let noun = if removed == 1 { "entry" } else { "entries" };
                    println!("Removed {removed} {noun} for {}", request.ticker);
                    Ok(())
                }
            }
        }
    }
}

fn load_config(path: Option<&Path>, cache_file: Option<PathBuf>) -> Result<ScraperConfig> {
    let mut config = match path {
        Some(path) => ScraperConfig::from_file(path)?,
        None => ScraperConfig::default(),
    };
    if let Some(cache_file) = cache_file {
        config.cache.path = cache_file;
    }
    Ok(config)
}

fn build_request(
    ticker: &str,
    source: SourceSelector,
    fields: &str,
    cache_mode: CacheMode,
) -> Result<Request> {
    let ticker = Ticker::new(ticker)?;
    let fields = FieldName::parse_list(fields)?;
    Ok(Request::new(ticker)
        .with_source(source)
        .with_fields(fields)
        .with_cache_mode(cache_mode))
}

fn run_fetch(
    config: &ScraperConfig,
    ticker: &str,
    source: SourceSelector,
    fields: &str,
    cache_mode: CacheMode,
) -> Result<()> {
    let request = build_request(ticker, source, fields, cache_mode)?;
    let service = FiiService::from_config(config).context("failed to set up HTTP client")?;

    let response = service.handle(&request)?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.data.is_none() {
        tracing::warn!(ticker = %request.ticker, "no provider returned any data");
    }
    Ok(())
}

fn run_cache_status(cache: &CacheStore) -> Result<()> {
    if !cache.path().exists() {
        println!("Cache file does not exist: {}", cache.path().display());
        return Ok(());
    }

    let status = cache.status()?;
    println!("Cache: {}", cache.path().display());
    println!("TTL:   {}h", cache.ttl().num_hours());
    println!();
    println!("{:<10} {:>8}", "Entries", status.total);
    println!("{:<10} {:>8}", "Fresh", status.fresh);
    println!("{:<10} {:>8}", "Stale", status.stale);
    println!("{:<10} {:>8}", "Corrupt", status.corrupt);
    Ok(())
}

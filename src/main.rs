//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest bulk fetcher.

use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_harvest::config::{load_config_with_hash, validate, Config};
use sumi_harvest::harvest::{run_harvest, scan_input};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a bulk URL fetcher with a durable local store
///
/// Sumi-Harvest reads a list of URLs (one per line), fetches each one with
/// bounded concurrency, and stores every body in SQLite. URLs that are
/// already stored are skipped, so an interrupted run can simply be repeated.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A bulk URL fetcher with a durable local store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Path to the URL list, one URL per line
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(short, long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Maximum number of URLs in flight at once
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Additional save attempts after the first failure
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay between save attempts in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and input without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match load_effective_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(input) = &cli.input {
        config.input.urls_path = input.display().to_string();
    }
    if let Some(database) = &cli.database {
        config.output.database_path = database.display().to_string();
    }
    if let Some(concurrency) = cli.concurrency {
        config.harvest.concurrency = concurrency;
    }
    if let Some(max_retries) = cli.max_retries {
        config.harvest.max_retries = max_retries;
    }
    if let Some(delay) = cli.retry_delay_ms {
        config.harvest.retry_delay_ms = delay;
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the --dry-run mode: validates config and input without fetching
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Harvest Configuration:");
    println!("  Concurrency: {}", config.harvest.concurrency);
    println!("  Workers: {}", config.harvest.worker_count());
    println!("  Queue capacity: {}", config.harvest.queue_capacity());
    println!("  Max retries: {}", config.harvest.max_retries);
    println!("  Retry delay: {}ms ({:?})", config.harvest.retry_delay_ms, config.harvest.backoff);
    println!("  On existence check error: {:?}", config.harvest.on_exists_error);

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent());
    match config.fetcher.request_timeout_secs {
        Some(secs) => println!("  Request timeout: {}s", secs),
        None => println!("  Request timeout: none"),
    }
    println!("  Require success status: {}", config.fetcher.require_success_status);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let input = Path::new(&config.input.urls_path);
    println!("\nInput: {}", input.display());
    let scan = scan_input(input)?;
    println!("  URLs: {}", scan.urls);
    println!("  Blank/comment lines: {}", scan.blank);
    println!("  Invalid lines: {}", scan.invalid.len());
    for (line, reason) in &scan.invalid {
        println!("    line {}: {}", line, reason);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would process {} URLs", scan.urls);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use sumi_harvest::output::{load_statistics, print_statistics};
    use sumi_harvest::storage::open_storage;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    use sumi_harvest::output::print_run_summary;

    tracing::info!(
        "Harvesting {} into {}",
        config.input.urls_path,
        config.output.database_path
    );

    match run_harvest(config).await {
        Ok(summary) => {
            tracing::info!("Harvest completed");
            if !quiet {
                print_run_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

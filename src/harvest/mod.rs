//! Harvest module: the bounded-concurrency fetch pipeline
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching of whole bodies
//! - Retry with delay around saves
//! - Workers that check, fetch and save one URL at a time
//! - The dispatcher that feeds the queue and drains the pool

mod context;
mod dispatcher;
mod fetcher;
mod outcome;
mod retry;
mod source;
mod worker;

pub use context::{HarvestContext, PipelineSettings};
pub use dispatcher::Dispatcher;
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher};
pub use outcome::{HarvestCounters, InFlightGuard, Outcome, RunSummary};
pub use retry::{retry, Backoff, RetryError, RetryPolicy};
pub use source::{decode_line, feed, parse_line, scan_input, InputLine, InputScan};
pub use worker::{SharedQueue, Task, Worker};

use crate::config::Config;
use crate::storage::{open_storage, Storage};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete harvest described by `config`
///
/// This is the main entry point. It will:
/// 1. Open (or create) the SQLite store
/// 2. Build the HTTP client and retry policy
/// 3. Feed every URL from the input file through the worker pool
/// 4. Return the run totals once the pool has drained
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::load_config;
/// use sumi_harvest::harvest::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_harvest(&config).await?;
/// println!("{} saved", summary.saved);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: &Config) -> Result<RunSummary, HarvestError> {
    let storage: Arc<dyn Storage> =
        Arc::new(open_storage(Path::new(&config.output.database_path))?);
    let ctx = HarvestContext::from_config(config, storage)?;

    Dispatcher::new(ctx)
        .run_file(Path::new(&config.input.urls_path))
        .await
}

//! Explicit dependencies for one harvest run

use crate::config::{Config, ExistsErrorPolicy};
use crate::harvest::fetcher::Fetcher;
use crate::harvest::retry::RetryPolicy;
use crate::storage::Storage;
use crate::HarvestError;
use std::sync::Arc;

/// Pool sizing and per-URL policies
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Size of the admission gate; bounds in-flight URLs
    pub concurrency: usize,

    /// Number of worker tasks draining the queue
    pub workers: usize,

    /// Capacity of the feeder queue
    pub queue_capacity: usize,

    pub on_exists_error: ExistsErrorPolicy,
}

impl PipelineSettings {
    /// Settings with `workers` and `queue_capacity` equal to `concurrency`
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            workers: concurrency,
            queue_capacity: concurrency,
            on_exists_error: ExistsErrorPolicy::default(),
        }
    }
}

/// Everything a dispatcher and its workers share
///
/// Built once per run and cloned into each worker; the clones share the
/// same storage handle and HTTP connection pool.
#[derive(Clone)]
pub struct HarvestContext {
    pub storage: Arc<dyn Storage>,
    pub fetcher: Arc<Fetcher>,
    pub retry_policy: RetryPolicy,
    pub settings: PipelineSettings,
}

impl HarvestContext {
    pub fn new(
        storage: Arc<dyn Storage>,
        fetcher: Fetcher,
        retry_policy: RetryPolicy,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            fetcher: Arc::new(fetcher),
            retry_policy,
            settings,
        }
    }

    /// Builds a context from validated configuration and an open store
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::new(&config.fetcher)?;
        let settings = PipelineSettings {
            concurrency: config.harvest.concurrency,
            workers: config.harvest.worker_count(),
            queue_capacity: config.harvest.queue_capacity(),
            on_exists_error: config.harvest.on_exists_error,
        };

        Ok(Self::new(
            storage,
            fetcher,
            RetryPolicy::from_config(&config.harvest),
            settings,
        ))
    }
}

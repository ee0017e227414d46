//! Worker - processes one URL at a time from the shared queue
//!
//! Each URL goes through the same terminal state machine:
//! 1. Acquire a concurrency slot
//! 2. Check the store; skip if already present
//! 3. Fetch (never retried)
//! 4. Save with retry
//! 5. Report the outcome
//!
//! The slot is an owned semaphore permit held for the whole sequence, so it is
//! released on every exit path.

use crate::config::ExistsErrorPolicy;
use crate::harvest::context::HarvestContext;
use crate::harvest::fetcher::FetchedPage;
use crate::harvest::outcome::{HarvestCounters, Outcome};
use crate::harvest::retry::{retry, RetryError};
use crate::storage::{StorageError, StorageResult};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};

/// One URL read from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub url: String,

    /// 1-based line number in the input
    pub line: usize,
}

/// Receiving end of the task queue, shared by all workers
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<Task>>>;

/// A long-lived execution unit draining the task queue
pub struct Worker {
    id: usize,
    ctx: HarvestContext,
    gate: Arc<Semaphore>,
    counters: Arc<HarvestCounters>,
}

impl Worker {
    pub fn new(
        id: usize,
        ctx: HarvestContext,
        gate: Arc<Semaphore>,
        counters: Arc<HarvestCounters>,
    ) -> Self {
        Self {
            id,
            ctx,
            gate,
            counters,
        }
    }

    /// Pulls tasks until the queue is closed and empty
    pub async fn run(self, queue: SharedQueue) {
        tracing::trace!("Worker {} started", self.id);

        loop {
            // Hold the lock only for the receive
            let task = {
                let mut rx = queue.lock().await;
                rx.recv().await
            };

            let Some(task) = task else {
                break;
            };

            let outcome = self.process(&task).await;
            self.counters.record(outcome);
        }

        tracing::trace!("Worker {} finished", self.id);
    }

    /// Processes a single URL and returns its terminal outcome
    pub async fn process(&self, task: &Task) -> Outcome {
        let url = task.url.as_str();

        let Ok(_slot) = Arc::clone(&self.gate).acquire_owned().await else {
            tracing::warn!("Admission gate closed, leaving {}", url);
            return Outcome::Deferred;
        };
        let _in_flight = self.counters.enter();

        match self.check_exists(url).await {
            Ok(true) => {
                tracing::info!("Skipping URL (already in database): {}", url);
                return Outcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                self.counters.record_exists_check_failed();
                match self.ctx.settings.on_exists_error {
                    ExistsErrorPolicy::Proceed => {
                        tracing::warn!(
                            "Error checking URL existence for {}, fetching anyway: {}",
                            url,
                            e
                        );
                    }
                    ExistsErrorPolicy::Skip => {
                        tracing::warn!(
                            "Error checking URL existence for {}, leaving it for a later run: {}",
                            url,
                            e
                        );
                        return Outcome::Deferred;
                    }
                }
            }
        }

        let page = match self.ctx.fetcher.fetch(url).await {
            Ok(page) => Arc::new(page),
            Err(e) => {
                tracing::warn!("Error fetching {}: {}", url, e);
                return Outcome::FetchFailed;
            }
        };

        match self.save_with_retry(page).await {
            Ok(()) => {
                tracing::info!("Processed URL: {}", url);
                Outcome::Saved
            }
            Err(RetryError::Permanent {
                source: StorageError::AlreadyExists(_),
                ..
            }) => {
                tracing::info!("Skipping URL (stored by another worker): {}", url);
                Outcome::Duplicate
            }
            Err(e) => {
                tracing::error!("Error saving to database for {}: {}", url, e);
                Outcome::SaveFailed
            }
        }
    }

    async fn check_exists(&self, url: &str) -> StorageResult<bool> {
        let storage = Arc::clone(&self.ctx.storage);
        let url = url.to_string();

        tokio::task::spawn_blocking(move || storage.exists(&url))
            .await
            .map_err(|e| StorageError::Database(format!("existence check task failed: {}", e)))?
    }

    async fn save_with_retry(&self, page: Arc<FetchedPage>) -> Result<(), RetryError<StorageError>> {
        let label = page.url.clone();

        retry(
            &self.ctx.retry_policy,
            &label,
            || {
                let storage = Arc::clone(&self.ctx.storage);
                let page = Arc::clone(&page);
                async move {
                    tokio::task::spawn_blocking(move || storage.save(&page))
                        .await
                        .map_err(|e| StorageError::Database(format!("save task failed: {}", e)))?
                }
            },
            StorageError::is_transient,
        )
        .await
    }
}

//! Dispatcher - owns the worker pool for one harvest run
//!
//! Topology:
//! - one feeder task reading the input into a bounded queue
//! - `workers` worker tasks sharing the queue receiver
//! - one semaphore of `concurrency` permits gating in-flight URLs
//!
//! The semaphore is the only admission control. The queue bound just keeps
//! the feeder from reading the whole input into memory.

use crate::harvest::context::HarvestContext;
use crate::harvest::outcome::{HarvestCounters, RunSummary};
use crate::harvest::source::feed;
use crate::harvest::worker::{SharedQueue, Task, Worker};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;

/// Runs URL lists to completion through a bounded worker pool
pub struct Dispatcher {
    ctx: HarvestContext,
}

impl Dispatcher {
    pub fn new(ctx: HarvestContext) -> Self {
        Self { ctx }
    }

    /// Opens `path` and runs every URL in it
    ///
    /// Failing to open the file is a setup failure and nothing is fetched.
    pub async fn run_file(&self, path: &Path) -> Result<RunSummary, HarvestError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| HarvestError::Input {
                path: path.display().to_string(),
                source,
            })?;

        self.run(BufReader::new(file)).await
    }

    /// Runs every URL read from `source` and waits for the pool to drain
    ///
    /// # Flow
    ///
    /// 1. Create the queue, the admission gate and the counters
    /// 2. Spawn the workers, then the feeder
    /// 3. Wait for the feeder to close the queue
    /// 4. Join every worker
    ///
    /// Per-URL failures never end the run early; they show up in the summary.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Every enqueued URL reached a terminal outcome
    /// * `Err(HarvestError)` - Reading the input failed or a worker panicked;
    ///   the pool is still drained before returning
    pub async fn run<R>(&self, source: R) -> Result<RunSummary, HarvestError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let settings = &self.ctx.settings;
        let start = Instant::now();

        tracing::info!(
            "Starting harvest: {} workers, concurrency {}, queue capacity {}",
            settings.workers,
            settings.concurrency,
            settings.queue_capacity
        );

        let counters = Arc::new(HarvestCounters::default());
        let gate = Arc::new(Semaphore::new(settings.concurrency));
        let (tx, rx) = mpsc::channel::<Task>(settings.queue_capacity);
        let queue: SharedQueue = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for id in 0..settings.workers {
            let worker = Worker::new(
                id,
                self.ctx.clone(),
                Arc::clone(&gate),
                Arc::clone(&counters),
            );
            workers.spawn(worker.run(Arc::clone(&queue)));
        }
        // Only workers hold the receiver, so the feeder notices if they all die
        drop(queue);

        let feeder = tokio::spawn(feed(source, tx, Arc::clone(&counters)));

        let feed_result = feeder.await;

        let mut worker_error = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                worker_error.get_or_insert(e);
            }
        }

        match feed_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!("Failed reading URL input: {}", e);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }
        if let Some(e) = worker_error {
            return Err(e.into());
        }

        let summary = counters.summary(start.elapsed());
        tracing::info!(
            "All workers have completed: {} enqueued, {} saved, {} skipped, {} failed in {:?}",
            summary.enqueued,
            summary.saved,
            summary.skipped + summary.duplicates + summary.deferred,
            summary.failed(),
            summary.elapsed
        );

        Ok(summary)
    }
}

//! The bounded fulfillment queue and the workers draining it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

use crate::worker::{WorkerContext, run_worker};
use crate::{FulfillmentError, FulfillmentJob, InventorySyncService, NotificationService};

/// Sizing of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Jobs the queue holds before submitters wait.
    pub queue_capacity: usize,
    /// Number of concurrent workers.
    pub worker_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            worker_count: 3,
        }
    }
}

/// Returned by [`WorkerPool::stop`] once every worker has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Jobs processed over the lifetime of the pool.
    pub jobs_processed: u64,
    /// Workers that exited by panicking instead of draining.
    pub workers_failed: usize,
}

/// Handle used to enqueue jobs. Cheap to clone.
///
/// Submissions hold a read lock on the sender; [`WorkerPool::stop`] takes the
/// write lock to close the queue. A submission therefore either completes
/// before the queue closes or observes it closed, never in between.
#[derive(Clone)]
pub struct JobSubmitter {
    sender: Arc<RwLock<Option<mpsc::Sender<FulfillmentJob>>>>,
}

impl JobSubmitter {
    /// Enqueues a job, waiting while the queue is full.
    ///
    /// Fails with [`FulfillmentError::QueueClosed`] once the pool has begun
    /// stopping.
    pub async fn submit(&self, job: FulfillmentJob) -> Result<(), FulfillmentError> {
        let guard = self.sender.read().await;
        let Some(sender) = guard.as_ref() else {
            return Err(FulfillmentError::QueueClosed);
        };

        sender
            .send(job)
            .await
            .map_err(|_| FulfillmentError::QueueClosed)?;

        metrics::counter!("fulfillment_jobs_submitted_total").increment(1);
        Ok(())
    }

    /// Returns true once the pool stopped accepting jobs.
    pub async fn is_closed(&self) -> bool {
        self.sender.read().await.is_none()
    }
}

/// A fixed set of workers draining one bounded FIFO queue.
pub struct WorkerPool {
    submitter: JobSubmitter,
    workers: Vec<JoinHandle<()>>,
    ctx: Arc<WorkerContext>,
}

impl WorkerPool {
    /// Allocates the queue and spawns the workers on the current runtime.
    ///
    /// Zero capacity or zero workers are raised to one.
    pub fn start(
        config: PoolConfig,
        notifier: Arc<dyn NotificationService>,
        inventory: Arc<dyn InventorySyncService>,
    ) -> Self {
        let capacity = config.queue_capacity.max(1);
        let worker_count = config.worker_count.max(1);

        let (tx, rx) = mpsc::channel(capacity);
        let ctx = Arc::new(WorkerContext {
            queue: Mutex::new(rx),
            notifier,
            inventory,
            processed: AtomicU64::new(0),
        });

        let workers = (0..worker_count)
            .map(|worker_id| tokio::spawn(run_worker(worker_id, Arc::clone(&ctx))))
            .collect();

        tracing::info!(capacity, worker_count, "fulfillment worker pool started");

        Self {
            submitter: JobSubmitter {
                sender: Arc::new(RwLock::new(Some(tx))),
            },
            workers,
            ctx,
        }
    }

    /// Returns a handle for enqueuing jobs.
    pub fn submitter(&self) -> JobSubmitter {
        self.submitter.clone()
    }

    /// Number of workers owned by the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue, then waits until every worker has drained it and
    /// exited.
    ///
    /// Jobs already queued are still processed. Later submissions fail with
    /// [`FulfillmentError::QueueClosed`].
    pub async fn stop(self) -> DrainSummary {
        // Dropping the only sender closes the channel. Waits for in-flight
        // submissions holding the read lock.
        self.submitter.sender.write().await.take();
        tracing::info!(
            workers = self.workers.len(),
            "job queue closed, draining workers"
        );

        let mut workers_failed = 0;
        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                workers_failed += 1;
                tracing::error!(worker_id, error = %e, "fulfillment worker panicked");
            }
        }

        let summary = DrainSummary {
            jobs_processed: self.ctx.processed.load(Ordering::Relaxed),
            workers_failed,
        };
        tracing::info!(
            jobs_processed = summary.jobs_processed,
            "fulfillment worker pool stopped"
        );
        summary
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{FulfillmentJob, InventorySyncService, NotificationService};

/// What every worker of one pool shares.
pub(crate) struct WorkerContext {
    pub queue: Mutex<mpsc::Receiver<FulfillmentJob>>,
    pub notifier: Arc<dyn NotificationService>,
    pub inventory: Arc<dyn InventorySyncService>,
    pub processed: AtomicU64,
}

/// Consumes jobs until the queue is closed and empty.
pub(crate) async fn run_worker(worker_id: usize, ctx: Arc<WorkerContext>) {
    tracing::debug!(worker_id, "fulfillment worker started");

    loop {
        // The lock is released before the job runs so other workers can
        // pick up the next one.
        let job = { ctx.queue.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        process_job(worker_id, &ctx, &job).await;
        ctx.processed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("fulfillment_jobs_processed_total").increment(1);
    }

    tracing::debug!(worker_id, "fulfillment worker stopped");
}

async fn process_job(worker_id: usize, ctx: &WorkerContext, job: &FulfillmentJob) {
    tracing::info!(worker_id, order_number = %job.order_number, "processing order");

    if let Err(e) = ctx.notifier.send_confirmation(job).await {
        tracing::warn!(
            worker_id,
            order_number = %job.order_number,
            error = %e,
            "failed to send order confirmation"
        );
        metrics::counter!("fulfillment_step_failures_total", "step" => "notification")
            .increment(1);
    }

    if let Err(e) = ctx.inventory.sync_order(job).await {
        tracing::warn!(
            worker_id,
            order_number = %job.order_number,
            error = %e,
            "failed to sync inventory"
        );
        metrics::counter!("fulfillment_step_failures_total", "step" => "inventory_sync")
            .increment(1);
    }

    tracing::info!(worker_id, order_number = %job.order_number, "order processed");
}

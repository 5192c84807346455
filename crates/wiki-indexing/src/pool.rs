//! Per-index worker pools.
//!
//! Each index owns one bounded queue, one distributor task feeding it and
//! a fixed number of worker tasks draining it. A full queue blocks only
//! its own distributor, so a slow index never throttles a fast one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wiki_types::{IndexOperator, PageIdentifier};

use crate::coordinator::Shared;

/// Minimum slack added to every queue.
const MIN_QUEUE_SLACK: usize = 10;

/// Queue capacity for a run of `pages` identifiers.
///
/// Sized so a typical corpus fits without the distributor ever blocking:
/// `pages + max(pages / 5, 10)`.
pub fn queue_capacity(pages: usize) -> usize {
    pages + (pages / 5).max(MIN_QUEUE_SLACK)
}

/// Static description of one index's pool.
pub(crate) struct IndexWorkerPool {
    pub name: String,
    pub operator: Arc<dyn IndexOperator>,
    pub worker_count: usize,
}

/// Everything a pool task needs for one run.
#[derive(Clone)]
pub(crate) struct PoolRun {
    pub index: usize,
    pub generation: u64,
    pub name: String,
    pub operator: Arc<dyn IndexOperator>,
    pub shared: Arc<Shared>,
    pub token: CancellationToken,
    /// Identifiers sitting in this run's queue
    pub depth: Arc<AtomicUsize>,
}

impl PoolRun {
    fn enqueued(&self) {
        self.depth.fetch_add(1, Ordering::SeqCst);
    }

    fn dequeued(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(1)));
    }
}

/// Push every identifier into the queue in input order, then close it.
pub(crate) async fn distribute(
    run: PoolRun,
    tx: mpsc::Sender<PageIdentifier>,
    pages: Arc<[PageIdentifier]>,
) {
    for page in pages.iter() {
        let permit = tokio::select! {
            biased;
            _ = run.token.cancelled() => {
                debug!(index = %run.name, "Distribution cancelled");
                return;
            }
            permit = tx.reserve() => permit,
        };
        let Ok(permit) = permit else {
            debug!(index = %run.name, "Queue closed before distribution finished");
            return;
        };

        // Counted before it becomes visible, so workers never see it uncounted
        run.enqueued();
        permit.send(page.clone());
    }

    drop(tx);
    run.shared
        .mark_distribution_complete(run.index, run.generation);
    debug!(index = %run.name, pages = pages.len(), "Distribution complete");
}

/// Drain the queue into the index until it closes or the run is cancelled.
pub(crate) async fn work(
    run: PoolRun,
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<PageIdentifier>>>,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = run.token.cancelled() => None,
            page = async { rx.lock().await.recv().await } => page,
        };
        let Some(page) = next else {
            break;
        };
        run.dequeued();

        let operator = run.operator.clone();
        let id = page.clone();
        let result = tokio::task::spawn_blocking(move || operator.add_page_to_index(&id)).await;

        match result {
            Ok(Ok(())) => {
                debug!(index = %run.name, worker, page = %page, "Indexed page");
                run.shared.record_success(run.index, run.generation);
            }
            Ok(Err(e)) => {
                warn!(index = %run.name, worker, page = %page, error = %e, "Failed to index page");
                run.shared
                    .record_failure(run.index, run.generation, e.to_string());
            }
            Err(e) => {
                warn!(index = %run.name, worker, page = %page, error = %e, "Index operation panicked");
                run.shared.record_failure(
                    run.index,
                    run.generation,
                    format!("index operation panicked: {}", e),
                );
            }
        }
    }

    debug!(
        index = %run.name,
        worker,
        cancelled = run.token.is_cancelled(),
        "Worker exiting"
    );
}

//! Background indexing coordinator.
//!
//! Runs one worker pool per index so every index progresses at its own
//! pace, and exposes the same add/remove contract synchronously for
//! single-page edits.
//!
//! Lifecycle: `Idle -> Running -> {Completed, Stopped}`. Completion is
//! detected by the task whose event satisfies it (the worker recording the
//! final page, or the distributor finishing last), inside the same critical
//! section that records that event. Progress snapshots are pure reads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, Instrument, Span};

use wiki_types::operator::display_name;
use wiki_types::{IndexError, IndexOperator, PageIdentifier};

use crate::maintainer::MultiMaintainer;
use crate::pool::{self, queue_capacity, IndexWorkerPool, PoolRun};
use crate::progress::{estimate_remaining, rate, IndexProgressTracker, IndexingProgress};

#[derive(Debug, Default)]
pub(crate) struct CoordinatorState {
    running: bool,
    /// Incremented on every start; fences tasks of earlier runs
    generation: u64,
    total_pages: usize,
    started: Option<Instant>,
    trackers: Vec<IndexProgressTracker>,
    /// Queue depth counters of the current run, replaced on every start
    queue_depths: Vec<Arc<AtomicUsize>>,
}

/// State shared between the coordinator and its pool tasks.
pub(crate) struct Shared {
    state: RwLock<CoordinatorState>,
    running_tx: watch::Sender<bool>,
}

impl Shared {
    fn new(indexes: usize) -> Self {
        let (running_tx, _) = watch::channel(false);
        Self {
            state: RwLock::new(CoordinatorState {
                trackers: vec![IndexProgressTracker::default(); indexes],
                queue_depths: fresh_depths(indexes),
                ..Default::default()
            }),
            running_tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CoordinatorState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CoordinatorState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn record_success(&self, index: usize, generation: u64) {
        let mut state = self.write();
        if state.generation != generation {
            return;
        }
        state.trackers[index].record_success();
        self.complete_if_done(&mut state);
    }

    pub(crate) fn record_failure(&self, index: usize, generation: u64, error: String) {
        let mut state = self.write();
        if state.generation != generation {
            return;
        }
        state.trackers[index].record_error(error);
    }

    pub(crate) fn mark_distribution_complete(&self, index: usize, generation: u64) {
        let mut state = self.write();
        if state.generation != generation {
            return;
        }
        state.trackers[index].distribution_complete = true;
        self.complete_if_done(&mut state);
    }

    /// Flip `Running -> Completed` once every index has finished.
    ///
    /// Must be called with the write lock held so no reader can observe a
    /// finished run that still claims to be running.
    fn complete_if_done(&self, state: &mut CoordinatorState) {
        if !state.running {
            return;
        }

        let done = state
            .trackers
            .iter()
            .zip(&state.queue_depths)
            .all(|(tracker, depth)| tracker.is_done() && depth.load(Ordering::SeqCst) == 0);
        if !done {
            return;
        }

        state.running = false;
        self.running_tx.send_replace(false);

        let elapsed_ms = state
            .started
            .map(|s| s.elapsed().as_millis())
            .unwrap_or_default();
        info!(
            pages = state.total_pages,
            indexes = state.trackers.len(),
            elapsed_ms,
            "Background indexing completed"
        );
    }

    /// Flip `Running -> Stopped`, unless a newer run has started since.
    fn mark_stopped(&self, generation: u64) -> bool {
        let mut state = self.write();
        if state.generation != generation || !state.running {
            return false;
        }

        state.running = false;
        for depth in &state.queue_depths {
            depth.store(0, Ordering::SeqCst);
        }
        self.running_tx.send_replace(false);
        true
    }
}

fn fresh_depths(indexes: usize) -> Vec<Arc<AtomicUsize>> {
    (0..indexes).map(|_| Arc::new(AtomicUsize::new(0))).collect()
}

/// Tasks and cancellation handle of the current run.
///
/// `pools` also carries the trackers of completed runs that were replaced
/// before anyone joined them.
struct ActiveRun {
    generation: u64,
    token: CancellationToken,
    pools: Vec<TaskTracker>,
}

/// Coordinates background indexing across several independent indexes.
pub struct BackgroundIndexingCoordinator {
    pools: Vec<IndexWorkerPool>,
    maintainer: MultiMaintainer,
    shared: Arc<Shared>,
    active: Mutex<Option<ActiveRun>>,
    span: Span,
}

impl BackgroundIndexingCoordinator {
    /// Create a coordinator over `(index, worker count)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if any worker count is zero. That is a configuration
    /// mistake, not a runtime condition.
    pub fn new(indexes: Vec<(Arc<dyn IndexOperator>, usize)>) -> Self {
        let names = unique_labels(
            indexes
                .iter()
                .map(|(operator, _)| display_name(operator.as_ref()))
                .collect(),
        );

        let mut pools = Vec::with_capacity(indexes.len());
        let mut operators = Vec::with_capacity(indexes.len());
        for ((operator, worker_count), name) in indexes.into_iter().zip(names) {
            assert!(
                worker_count > 0,
                "worker count for index '{}' must be positive",
                name
            );
            operators.push(operator.clone());
            pools.push(IndexWorkerPool {
                name,
                operator,
                worker_count,
            });
        }

        let shared = Arc::new(Shared::new(pools.len()));
        Self {
            pools,
            maintainer: MultiMaintainer::new(operators),
            shared,
            active: Mutex::new(None),
            span: tracing::info_span!("background_indexing"),
        }
    }

    /// Use `span` as the parent span for every pool task.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Start indexing `pages` into every index in the background.
    ///
    /// Does nothing if a run is already in progress. Must be called from
    /// within a Tokio runtime.
    pub fn start_background(&self, pages: Vec<PageIdentifier>) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());

        let total = pages.len();
        let capacity = queue_capacity(total);
        let depths = fresh_depths(self.pools.len());
        let generation = {
            let mut state = self.shared.write();
            if state.running {
                debug!("Background indexing already running, ignoring start");
                return;
            }

            let now = Instant::now();
            let started_at = Utc::now();
            state.running = true;
            state.generation += 1;
            state.total_pages = total;
            state.started = Some(now);
            state.queue_depths = depths.clone();
            for tracker in &mut state.trackers {
                tracker.reset(total, now, started_at);
            }
            self.shared.running_tx.send_replace(true);
            state.generation
        };

        info!(
            pages = total,
            indexes = self.pools.len(),
            capacity,
            "Starting background indexing"
        );

        let token = CancellationToken::new();
        let pages: Arc<[PageIdentifier]> = pages.into();
        let mut trackers = Vec::with_capacity(self.pools.len());

        for ((index, pool), depth) in self.pools.iter().enumerate().zip(depths) {
            let (tx, rx) = mpsc::channel(capacity);
            let rx = Arc::new(tokio::sync::Mutex::new(rx));
            let run = PoolRun {
                index,
                generation,
                name: pool.name.clone(),
                operator: pool.operator.clone(),
                shared: self.shared.clone(),
                token: token.clone(),
                depth,
            };

            let tracker = TaskTracker::new();
            for worker in 0..pool.worker_count {
                tracker.spawn(pool::work(run.clone(), worker, rx.clone()).instrument(self.span.clone()));
            }
            tracker.spawn(pool::distribute(run, tx, pages.clone()).instrument(self.span.clone()));
            tracker.close();
            trackers.push(tracker);

            debug!(index = %pool.name, workers = pool.worker_count, "Started worker pool");
        }

        // A coordinator without indexes has nothing to wait for
        if self.pools.is_empty() {
            let mut state = self.shared.write();
            self.shared.complete_if_done(&mut state);
        }

        // Tasks of a completed run are already draining out; the next stop
        // joins them together with this run
        if let Some(previous) = active.take() {
            previous.token.cancel();
            trackers.extend(previous.pools);
        }
        *active = Some(ActiveRun {
            generation,
            token,
            pools: trackers,
        });
    }

    /// Cancel the current run and wait for every pool task to exit.
    ///
    /// Pages still queued are dropped; calls already inside an index run
    /// to completion first. After a completed run this only joins the
    /// tasks that are still winding down.
    pub async fn stop(&self) {
        if let Some(run) = self.take_active() {
            self.finish(run).await;
        }
    }

    fn take_active(&self) -> Option<ActiveRun> {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Cancel and join `run`, then mark it stopped if it is still current.
    ///
    /// A `start_background` racing with the join owns the state from then
    /// on and is left running.
    async fn finish(&self, run: ActiveRun) {
        run.token.cancel();
        for tracker in &run.pools {
            tracker.wait().await;
        }

        if self.shared.mark_stopped(run.generation) {
            info!(generation = run.generation, "Background indexing stopped");
        }
    }

    /// Snapshot of overall and per-index progress.
    pub fn get_progress(&self) -> IndexingProgress {
        let state = self.shared.read();
        let now = Instant::now();

        let per_index: Vec<_> = self
            .pools
            .iter()
            .zip(&state.trackers)
            .zip(&state.queue_depths)
            .map(|((pool, tracker), depth)| {
                tracker.snapshot(&pool.name, depth.load(Ordering::SeqCst), now)
            })
            .collect();

        let completed_pages = per_index.iter().map(|p| p.completed).min().unwrap_or(0);
        let queue_depth = per_index.iter().map(|p| p.queue_depth).sum();

        IndexingProgress {
            is_running: state.running,
            total_pages: state.total_pages,
            completed_pages,
            queue_depth,
            processing_rate: rate(completed_pages, state.started, now),
            estimated_time_remaining: estimate_remaining(&per_index),
            index_progress: per_index
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// Check whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.shared.read().running
    }

    /// Watch the running flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.running_tx.subscribe()
    }

    /// Wait until no run is in progress.
    ///
    /// A run where some index keeps failing never completes on its own;
    /// callers that need a bound should wrap this in a timeout.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|running| !*running).await;
    }

    /// Labels of the registered indexes, in registration order.
    pub fn index_names(&self) -> Vec<String> {
        self.pools.iter().map(|p| p.name.clone()).collect()
    }
}

impl IndexOperator for BackgroundIndexingCoordinator {
    /// Apply to every index immediately, bypassing the queues.
    fn add_page_to_index(&self, id: &str) -> Result<(), IndexError> {
        self.maintainer.add_page_to_index(id)
    }

    /// Remove from every index immediately, bypassing the queues.
    fn remove_page_from_index(&self, id: &str) -> Result<(), IndexError> {
        self.maintainer.remove_page_from_index(id)
    }
}

/// Suffix repeated labels so every index has its own progress entry.
fn unique_labels(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{}-{}", name, count)
            }
        })
        .collect()
}

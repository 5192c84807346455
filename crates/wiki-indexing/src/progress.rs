//! Progress tracking for background indexing.
//!
//! Trackers live behind the coordinator's lock and are only mutated by
//! worker and distributor tasks. Snapshots are plain serializable values.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Progress of a single index within a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SingleIndexProgress {
    /// Index label
    pub name: String,
    /// Pages successfully indexed
    pub completed: usize,
    /// Pages whose last attempt failed; never retried within a run
    pub failed: usize,
    /// Pages submitted in this run
    pub total: usize,
    /// Pages waiting in this index's queue
    pub queue_depth: usize,
    /// Pages per second since the run started
    pub processing_rate: f64,
    /// Most recent failure; kept across later successes
    pub last_error: Option<String>,
    /// Whether every identifier has been handed to the queue
    pub work_distribution_complete: bool,
    /// When the run started for this index
    pub started_at: Option<DateTime<Utc>>,
}

impl SingleIndexProgress {
    /// Pages not yet successfully indexed.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// Check whether every page has been attempted.
    pub fn is_settled(&self) -> bool {
        self.work_distribution_complete && self.completed + self.failed >= self.total
    }
}

/// Snapshot of the whole coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexingProgress {
    /// Whether a run is in progress
    pub is_running: bool,
    /// Pages submitted in the current (or last) run
    pub total_pages: usize,
    /// Pages indexed by every index (the slowest index gates this)
    pub completed_pages: usize,
    /// Sum of all queue depths
    pub queue_depth: usize,
    /// Overall pages per second
    pub processing_rate: f64,
    /// Estimate derived from the slowest index
    pub estimated_time_remaining: Option<Duration>,
    /// Per-index progress keyed by index label
    pub index_progress: BTreeMap<String, SingleIndexProgress>,
}

impl IndexingProgress {
    /// Overall completion in percent (100 for an empty run).
    pub fn percent_complete(&self) -> f64 {
        if self.total_pages == 0 {
            return 100.0;
        }
        self.completed_pages as f64 / self.total_pages as f64 * 100.0
    }

    /// Check whether any index recorded an error.
    pub fn has_errors(&self) -> bool {
        self.index_progress
            .values()
            .any(|p| p.last_error.is_some())
    }

    /// Check whether every index has attempted every page.
    ///
    /// A run with failures settles without ever completing.
    pub fn is_settled(&self) -> bool {
        self.index_progress.values().all(SingleIndexProgress::is_settled)
    }
}

/// Mutable per-index state for the current run.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexProgressTracker {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub started: Option<Instant>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub distribution_complete: bool,
}

impl IndexProgressTracker {
    /// Reset for a new run of `total` pages.
    pub fn reset(&mut self, total: usize, started: Instant, started_at: DateTime<Utc>) {
        self.completed = 0;
        self.failed = 0;
        self.total = total;
        self.started = Some(started);
        self.started_at = Some(started_at);
        self.last_error = None;
        self.distribution_complete = false;
    }

    pub fn record_success(&mut self) {
        if self.completed < self.total {
            self.completed += 1;
        }
    }

    pub fn record_error(&mut self, error: String) {
        self.failed += 1;
        self.last_error = Some(error);
    }

    pub fn is_done(&self) -> bool {
        self.distribution_complete && self.completed >= self.total
    }

    pub fn snapshot(&self, name: &str, queue_depth: usize, now: Instant) -> SingleIndexProgress {
        SingleIndexProgress {
            name: name.to_string(),
            completed: self.completed,
            failed: self.failed,
            total: self.total,
            queue_depth,
            processing_rate: rate(self.completed, self.started, now),
            last_error: self.last_error.clone(),
            work_distribution_complete: self.distribution_complete,
            started_at: self.started_at,
        }
    }
}

/// Pages per second between `started` and `now`.
pub(crate) fn rate(completed: usize, started: Option<Instant>, now: Instant) -> f64 {
    let Some(started) = started else {
        return 0.0;
    };
    let elapsed = now.saturating_duration_since(started).as_secs_f64();
    if elapsed > 0.0 {
        completed as f64 / elapsed
    } else {
        0.0
    }
}

/// Estimate the time left from the slowest index that still has work.
///
/// Returns `Some(ZERO)` when nothing remains and `None` while the slowest
/// index has no observable rate yet.
pub(crate) fn estimate_remaining(indexes: &[SingleIndexProgress]) -> Option<Duration> {
    let pending: Vec<_> = indexes.iter().filter(|p| p.remaining() > 0).collect();
    if pending.is_empty() {
        return Some(Duration::ZERO);
    }

    let slowest_rate = pending
        .iter()
        .map(|p| p.processing_rate)
        .fold(f64::INFINITY, f64::min);
    if slowest_rate <= 0.0 || !slowest_rate.is_finite() {
        return None;
    }

    let remaining = pending.iter().map(|p| p.remaining()).max().unwrap_or(0);
    Some(Duration::from_secs_f64(remaining as f64 / slowest_rate))
}

//! Fan-out/join aggregation of lookups.
//!
//! Each dispatched input runs as its own tokio task. Results are appended
//! to a shared [`ResultSet`] under a mutex held only for the append, and a
//! [`CompletionTracker`] is decremented after the append so that
//! [`Aggregator::wait`] observes every result once it returns.

use super::tracker::CompletionTracker;
use crate::error::{AggregateError, LookupError};
use crate::lookup::Lookup;
use crate::models::{ResultSet, UnitFailure, WorkItem};
use futures::FutureExt;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What `wait` does when some units failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return successes and failures together.
    #[default]
    BestEffort,
    /// Wait for every unit, then fail if any unit failed.
    Strict,
}

/// Options for an aggregation.
#[derive(Debug, Clone, Default)]
pub struct AggregatorOptions {
    /// Per-unit time limit. `None` lets every lookup run to completion.
    pub unit_timeout: Option<Duration>,
    /// Failure handling in `wait`.
    pub policy: FailurePolicy,
    /// Log the results collected so far after every append.
    pub log_snapshots: bool,
}

/// Runs one lookup per input concurrently and collects the results.
pub struct Aggregator<L> {
    lookup: Arc<L>,
    results: Arc<Mutex<ResultSet>>,
    tracker: Arc<CompletionTracker>,
    next_index: AtomicUsize,
    options: AggregatorOptions,
    progress: Option<ProgressBar>,
}

impl<L: Lookup> Aggregator<L> {
    pub fn with_options(lookup: L, options: AggregatorOptions) -> Self {
        Self {
            lookup: Arc::new(lookup),
            results: Arc::new(Mutex::new(ResultSet::new())),
            tracker: Arc::new(CompletionTracker::new()),
            next_index: AtomicUsize::new(0),
            options,
            progress: None,
        }
    }

    /// Advances `bar` by one for every completed unit.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        // inc_length is a no-op on a bar without a length
        if bar.length().is_none() {
            bar.set_length(0);
        }
        self.progress = Some(bar);
        self
    }

    /// Launches one task per input. Must be called from within a tokio runtime.
    pub fn dispatch<I, S>(&self, inputs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in inputs {
            let index = self.next_index.fetch_add(1, Ordering::Relaxed);
            let item = WorkItem::new(index, id);
            debug!("Dispatching unit {} ({})", item.index, item.id);

            self.tracker.add(1);
            if let Some(ref bar) = self.progress {
                bar.inc_length(1);
            }

            let unit = Unit {
                item,
                lookup: Arc::clone(&self.lookup),
                results: Arc::clone(&self.results),
                tracker: Arc::clone(&self.tracker),
                timeout: self.options.unit_timeout,
                log_snapshots: self.options.log_snapshots,
                progress: self.progress.clone(),
            };
            tokio::spawn(unit.run());
        }
    }

    /// Number of inputs dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.next_index.load(Ordering::Relaxed)
    }

    /// Number of units still running.
    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Copy of the successful results appended so far.
    pub async fn snapshot(&self) -> Vec<String> {
        self.results.lock().await.values().to_vec()
    }

    /// Waits for every dispatched unit to finish and returns the results.
    pub async fn wait(self) -> Result<ResultSet, AggregateError> {
        self.tracker.wait().await;

        let results = std::mem::take(&mut *self.results.lock().await);
        if let Some(ref bar) = self.progress {
            bar.finish();
        }

        let total = self.dispatched();
        info!(
            "Aggregation joined: {} of {} units succeeded",
            results.len(),
            total
        );
        debug!("{} units reported back", results.completed());

        if self.options.policy == FailurePolicy::Strict {
            if let Some(first) = results.failures().first() {
                return Err(AggregateError::UnitsFailed {
                    failed: results.failures().len(),
                    total,
                    first: first.error.clone(),
                });
            }
        }

        Ok(results)
    }
}

/// State moved into one spawned task.
struct Unit<L> {
    item: WorkItem,
    lookup: Arc<L>,
    results: Arc<Mutex<ResultSet>>,
    tracker: Arc<CompletionTracker>,
    timeout: Option<Duration>,
    log_snapshots: bool,
    progress: Option<ProgressBar>,
}

impl<L: Lookup> Unit<L> {
    async fn run(self) {
        let outcome = call_lookup(self.lookup.as_ref(), &self.item, self.timeout).await;

        if let Err(ref e) = outcome {
            warn!("Unit {} ({}) failed: {}", self.item.index, e.id(), e);
        }

        {
            let mut results = self.results.lock().await;
            match outcome {
                Ok(value) => results.push(value),
                Err(error) => results.push_failure(UnitFailure {
                    item: self.item.clone(),
                    error,
                }),
            }
        }

        if self.log_snapshots {
            let current = self.results.lock().await.values().to_vec();
            info!("The current results are: {:?}", current);
        }

        if let Some(bar) = self.progress {
            bar.inc(1);
        }

        self.tracker.done();
    }
}

/// Runs the lookup, turning timeouts and panics into [`LookupError`]s.
async fn call_lookup<L: Lookup>(
    lookup: &L,
    item: &WorkItem,
    timeout: Option<Duration>,
) -> Result<String, LookupError> {
    let call = AssertUnwindSafe(lookup.lookup(item)).catch_unwind();

    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(caught) => caught,
            Err(_) => {
                return Err(LookupError::TimedOut {
                    id: item.id.clone(),
                    limit_ms: limit.as_millis() as u64,
                })
            }
        },
        None => call.await,
    };

    match caught {
        Ok(outcome) => outcome,
        Err(_) => Err(LookupError::Panicked {
            id: item.id.clone(),
        }),
    }
}

//! Lookup operations performed by each unit of work.
//!
//! The aggregator is generic over [`Lookup`]; the implementations here
//! simulate a slow database call with a bounded random delay.

use crate::error::LookupError;
use crate::models::WorkItem;
use rand::Rng;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// An operation run once per work item.
pub trait Lookup: Send + Sync + 'static {
    fn lookup(
        &self,
        item: &WorkItem,
    ) -> impl Future<Output = Result<String, LookupError>> + Send;
}

/// Picks a delay uniformly in `[0, max]` at millisecond granularity.
pub fn random_delay(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

async fn simulate_latency(max: Duration) {
    let delay = random_delay(max);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Echoes the item id after a random delay. The default never sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedLookup {
    max_delay: Duration,
}

impl SimulatedLookup {
    pub fn new(max_delay: Duration) -> Self {
        Self { max_delay }
    }
}

impl Lookup for SimulatedLookup {
    async fn lookup(&self, item: &WorkItem) -> Result<String, LookupError> {
        simulate_latency(self.max_delay).await;
        debug!("Simulated lookup {} -> {}", item.index, item.id);
        Ok(item.id.clone())
    }
}

/// Serves records from an in-memory table after a random delay.
///
/// Missing ids are `NotFound`; blank records are `Failed`.
#[derive(Debug, Clone, Default)]
pub struct DatasetLookup {
    records: BTreeMap<String, String>,
    max_delay: Duration,
}

impl DatasetLookup {
    pub fn new(records: BTreeMap<String, String>, max_delay: Duration) -> Self {
        Self { records, max_delay }
    }

    /// Identifiers present in the table, in key order.
    pub fn ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }
}

impl Lookup for DatasetLookup {
    async fn lookup(&self, item: &WorkItem) -> Result<String, LookupError> {
        simulate_latency(self.max_delay).await;
        match self.records.get(&item.id) {
            Some(record) if record.trim().is_empty() => Err(LookupError::Failed {
                id: item.id.clone(),
                reason: "record is blank".to_string(),
            }),
            Some(record) => Ok(record.clone()),
            None => Err(LookupError::NotFound {
                id: item.id.clone(),
            }),
        }
    }
}

/// Adapts a synchronous closure into a lookup.
#[cfg(test)]
pub struct FnLookup<F> {
    f: F,
}

#[cfg(test)]
impl<F> FnLookup<F>
where
    F: Fn(&WorkItem) -> Result<String, LookupError> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[cfg(test)]
impl<F> Lookup for FnLookup<F>
where
    F: Fn(&WorkItem) -> Result<String, LookupError> + Send + Sync + 'static,
{
    async fn lookup(&self, item: &WorkItem) -> Result<String, LookupError> {
        (self.f)(item)
    }
}

/// Prints every successful result of the wrapped lookup.
pub struct Announced<L> {
    inner: L,
}

impl<L: Lookup> Announced<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: Lookup> Lookup for Announced<L> {
    async fn lookup(&self, item: &WorkItem) -> Result<String, LookupError> {
        let value = self.inner.lookup(item).await?;
        println!("   The result from the database is: {}", value);
        Ok(value)
    }
}

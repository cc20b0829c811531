//! Concurrent aggregation.
//!
//! [`Aggregator`] fans work out to tokio tasks and joins on a
//! [`tracker::CompletionTracker`] before handing the results back.

pub mod fanout;
pub mod tracker;

pub use fanout::{Aggregator, AggregatorOptions, FailurePolicy};

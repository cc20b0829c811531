//! Data models for the aggregator and the run report.
//!
//! This module contains the core data structures shared by the
//! aggregator, the demo sections and the report generator.

use crate::error::LookupError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single input handed to one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WorkItem {
    /// Position of the item in dispatch order (0-indexed, unique per aggregator).
    pub index: usize,
    /// Input identifier passed to the lookup.
    pub id: String,
}

impl WorkItem {
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
        }
    }
}

/// A unit whose lookup did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    /// The item the unit was working on.
    pub item: WorkItem,
    /// What went wrong.
    pub error: LookupError,
}

/// Results collected by an aggregation.
///
/// Element order reflects completion order and carries no meaning.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    values: Vec<String>,
    failures: Vec<UnitFailure>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful result.
    pub fn push(&mut self, value: String) {
        self.values.push(value);
    }

    /// Records a failed unit.
    pub fn push_failure(&mut self, failure: UnitFailure) {
        self.failures.push(failure);
    }

    /// Number of successful results.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of units that reported back, successful or not.
    pub fn completed(&self) -> usize {
        self.values.len() + self.failures.len()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn failures(&self) -> &[UnitFailure] {
        &self.failures
    }

    /// Returns the successful results sorted, for order-independent comparison.
    pub fn sorted_values(&self) -> Vec<String> {
        let mut values = self.values.clone();
        values.sort();
        values
    }

    /// Splits the set into successful results and failures.
    pub fn into_parts(self) -> (Vec<String>, Vec<UnitFailure>) {
        (self.values, self.failures)
    }
}

/// How a demo section executed its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One unit after another on the caller's task.
    Sequential,
    /// Fan-out/join through the aggregator.
    Concurrent,
    /// Fan-out/join with a snapshot logged after every append.
    ConcurrentWithSnapshots,
    /// Several independent aggregations joined together.
    Parallel,
    /// Producer/consumer or racing over channels.
    Channel,
    /// Plain synchronous computation.
    Direct,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Concurrent => write!(f, "concurrent"),
            ExecutionMode::ConcurrentWithSnapshots => write!(f, "concurrent + snapshots"),
            ExecutionMode::Parallel => write!(f, "parallel aggregations"),
            ExecutionMode::Channel => write!(f, "channel"),
            ExecutionMode::Direct => write!(f, "direct"),
        }
    }
}

/// Outcome of one demo section.
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    /// Section name as shown in the output.
    pub name: String,
    /// Execution mode used.
    pub mode: ExecutionMode,
    /// Number of inputs the section worked on.
    pub inputs: usize,
    /// Values the section produced.
    pub results: Vec<String>,
    /// Units that failed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UnitFailure>,
    /// Section-level error, if the section as a whole failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl SectionReport {
    pub fn new(name: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            name: name.into(),
            mode,
            inputs: 0,
            results: Vec::new(),
            failures: Vec::new(),
            error: None,
            duration_ms: 0,
        }
    }

    /// Creates a report for a section that failed as a whole.
    pub fn failed(name: impl Into<String>, mode: ExecutionMode, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(name, mode)
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.failures.is_empty()
    }
}

/// Metadata about a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    /// Program version.
    pub version: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total duration in seconds.
    pub duration_seconds: f64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub sections: Vec<SectionReport>,
}

impl RunReport {
    /// Number of sections that finished without any failure.
    pub fn successful_sections(&self) -> usize {
        self.sections.iter().filter(|s| s.succeeded()).count()
    }

    /// Total number of failed units across all sections.
    pub fn total_failures(&self) -> usize {
        self.sections.iter().map(|s| s.failures.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(id: &str) -> UnitFailure {
        UnitFailure {
            item: WorkItem::new(0, id),
            error: LookupError::NotFound { id: id.to_string() },
        }
    }

    #[test]
    fn test_result_set_counts() {
        let mut set = ResultSet::new();
        assert!(set.is_empty());

        set.push("id2".to_string());
        set.push("id1".to_string());
        set.push_failure(failure("id3"));

        assert_eq!(set.len(), 2);
        assert_eq!(set.completed(), 3);
        assert!(set.values().contains(&"id1".to_string()));
        assert_eq!(set.sorted_values(), vec!["id1", "id2"]);
        assert_eq!(set.failures()[0].item.id, "id3");
    }

    #[test]
    fn test_section_report_success() {
        let mut section = SectionReport::new("concurrent", ExecutionMode::Concurrent);
        assert!(section.succeeded());

        section.failures.push(failure("id1"));
        assert!(!section.succeeded());

        let failed = SectionReport::failed("deals", ExecutionMode::Channel, "boom".to_string());
        assert!(!failed.succeeded());
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_run_report_totals() {
        let mut with_failure = SectionReport::new("a", ExecutionMode::Concurrent);
        with_failure.failures.push(failure("x"));
        with_failure.failures.push(failure("y"));

        let report = RunReport {
            metadata: RunMetadata {
                version: "0.1.0".to_string(),
                started_at: Utc::now(),
                duration_seconds: 0.5,
            },
            sections: vec![
                SectionReport::new("b", ExecutionMode::Sequential),
                with_failure,
            ],
        };

        assert_eq!(report.successful_sections(), 1);
        assert_eq!(report.total_failures(), 2);
    }

    #[test]
    fn test_execution_mode_display() {
        assert_eq!(ExecutionMode::Sequential.to_string(), "sequential");
        assert_eq!(
            ExecutionMode::ConcurrentWithSnapshots.to_string(),
            "concurrent + snapshots"
        );
    }
}

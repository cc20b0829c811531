//! Error types for lookups, aggregation and the division helper.
//!
//! Application plumbing (config, IO, report output) uses `anyhow`;
//! these typed errors cover the parts callers match on.

use serde::Serialize;
use thiserror::Error;

/// Why a single unit of work did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupError {
    /// No record exists for the identifier.
    #[error("no record found for {id}")]
    NotFound { id: String },

    /// The lookup exceeded the per-unit time limit.
    #[error("lookup for {id} timed out after {limit_ms}ms")]
    TimedOut { id: String, limit_ms: u64 },

    /// The lookup reported a failure of its own.
    #[error("lookup for {id} failed: {reason}")]
    Failed { id: String, reason: String },

    /// The lookup panicked; the unit still completed.
    #[error("lookup for {id} panicked")]
    Panicked { id: String },
}

impl LookupError {
    /// Identifier of the work item the error belongs to.
    pub fn id(&self) -> &str {
        match self {
            LookupError::NotFound { id }
            | LookupError::TimedOut { id, .. }
            | LookupError::Failed { id, .. }
            | LookupError::Panicked { id } => id,
        }
    }
}

/// Errors returned when joining an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// At least one unit failed under the strict policy.
    #[error("{failed} of {total} units failed (first: {first})")]
    UnitsFailed {
        failed: usize,
        total: usize,
        first: LookupError,
    },
}

/// Errors from the integer division helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DivisionError {
    #[error("can't divide by zero")]
    DivisionByZero,

    /// The quotient does not fit (`i64::MIN / -1`).
    #[error("division overflows")]
    Overflow,
}

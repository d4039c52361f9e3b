//! Aggregation error types
//!
//! A failed aggregation is always distinct from an empty one: empty is a
//! successful zero-bucket outcome, these are not.

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::DbError;

use super::remote::RollupError;

/// Aggregation error taxonomy
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Reversed range, rejected before any fetch
    #[error("invalid date range: {from} is after {to}")]
    ReversedRange { from: NaiveDate, to: NaiveDate },

    /// Daily range longer than the maximum span, rejected before any fetch
    #[error("daily range of {days} days exceeds the {max}-day maximum")]
    RangeTooLong { days: i64, max: i64 },

    /// Record source query failed; propagated, never retried here
    #[error("failed to fetch meal records: {0}")]
    RecordFetch(#[from] DbError),

    /// Remote rollup delegation failed; propagated, never retried here
    #[error("remote rollup failed: {0}")]
    RemoteRollup(#[from] RollupError),
}

//! Date range and reporting period types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reporting period granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
            PeriodKind::Yearly => "yearly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(PeriodKind::Daily),
            "weekly" => Some(PeriodKind::Weekly),
            "monthly" => Some(PeriodKind::Monthly),
            "yearly" => Some(PeriodKind::Yearly),
            _ => None,
        }
    }
}

/// An inclusive calendar date range, `from <= to`.
///
/// Construction through [`DateRange::new`] enforces the ordering; a reversed
/// range is rejected rather than swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Create a range, returning `None` when `from > to`
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        if from <= to {
            Some(Self { from, to })
        } else {
            None
        }
    }

    /// Number of calendar days in the range, counting both endpoints
    pub fn inclusive_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

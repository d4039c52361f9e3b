//! Nutrition summary MCP tools
//!
//! The main aggregation entry point plus the range pre-validation predicate.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{
    is_range_allowed, rollup_stats, Aggregator, RequestTokens, MAX_DAILY_RANGE_DAYS,
};
use crate::models::{BucketSummary, PeriodKind, RollupStats};
use crate::timezone::TimezoneResolver;

/// Response for nutrition_summary
#[derive(Debug, Serialize)]
pub struct NutritionSummaryResponse {
    pub period: String,
    pub from: String,
    pub to: String,
    /// Zone the daily path bucketed in (informational for coarser periods)
    pub timezone: String,
    pub buckets: Vec<BucketSummary>,
    pub stats: RollupStats,
}

/// Response for check_summary_range
#[derive(Debug, Serialize)]
pub struct CheckRangeResponse {
    pub allowed: bool,
    pub inclusive_days: i64,
    /// Span limit for the daily period; coarser periods are unlimited
    pub max_daily_days: i64,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    s.parse::<NaiveDate>()
        .map_err(|e| format!("Invalid date {:?} (expected YYYY-MM-DD): {}", s, e))
}

fn parse_period(s: &str) -> Result<PeriodKind, String> {
    PeriodKind::from_str(s).ok_or_else(|| {
        format!(
            "Unknown period {:?} (expected daily, weekly, monthly, or yearly)",
            s
        )
    })
}

/// Compute a nutrition summary for a period and date range.
///
/// Returns `Ok(None)` when a newer request was issued while this one was in
/// flight; the stale result must not be shown.
pub async fn nutrition_summary(
    aggregator: &Aggregator,
    resolver: &TimezoneResolver,
    tokens: &RequestTokens,
    period: &str,
    start_date: &str,
    end_date: &str,
) -> Result<Option<NutritionSummaryResponse>, String> {
    let period = parse_period(period)?;
    let from = parse_date(start_date)?;
    let to = parse_date(end_date)?;

    let token = tokens.issue();

    let buckets = aggregator
        .summarize_dates(period, from, to)
        .await
        .map_err(|e| e.to_string())?;

    let response = NutritionSummaryResponse {
        period: period.as_str().to_string(),
        from: from.to_string(),
        to: to.to_string(),
        timezone: resolver.effective_timezone().name().to_string(),
        stats: rollup_stats(&buckets),
        buckets,
    };

    Ok(tokens.accept(token, response))
}

/// Pure range-size pre-validation, for disabling controls in the caller
pub fn check_summary_range(
    period: &str,
    start_date: &str,
    end_date: &str,
) -> Result<CheckRangeResponse, String> {
    let period = parse_period(period)?;
    let from = parse_date(start_date)?;
    let to = parse_date(end_date)?;

    Ok(CheckRangeResponse {
        allowed: is_range_allowed(period, from, to),
        inclusive_days: (to - from).num_days() + 1,
        max_daily_days: MAX_DAILY_RANGE_DAYS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_daily_guard() {
        let resp = check_summary_range("daily", "2025-01-01", "2025-01-29").unwrap();
        assert!(resp.allowed);
        assert_eq!(resp.inclusive_days, 29);

        let resp = check_summary_range("daily", "2025-01-01", "2025-01-30").unwrap();
        assert!(!resp.allowed);

        let resp = check_summary_range("yearly", "2000-01-01", "2025-12-31").unwrap();
        assert!(resp.allowed);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        assert!(check_summary_range("hourly", "2025-01-01", "2025-01-02").is_err());
        assert!(check_summary_range("daily", "01/01/2025", "2025-01-02").is_err());
    }
}

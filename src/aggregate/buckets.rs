//! Daily bucket enumeration
//!
//! Only the daily case is enumerated locally; coarser periods come
//! pre-bucketed from the remote rollup procedure. Keys are produced by
//! calendar-day arithmetic, not 24-hour intervals, so ranges spanning DST
//! transitions still get exactly one bucket per calendar day.

use crate::models::DateRange;

/// One "YYYY-MM-DD" key per calendar day in the range, ascending,
/// inclusive of both endpoints.
pub fn daily_bucket_keys(range: &DateRange) -> Vec<String> {
    let mut keys = Vec::with_capacity(range.inclusive_days().max(0) as usize);
    let mut day = range.from;
    while day <= range.to {
        keys.push(day.format("%Y-%m-%d").to_string());
        match day.succ_opt() {
            Some(next) => day = next,
            None => break, // NaiveDate::MAX
        }
    }
    keys
}

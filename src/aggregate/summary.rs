//! Summary computation
//!
//! The daily path is the locally-computed case: every record's UTC
//! timestamp is projected into the effective timezone and folded into its
//! local calendar-day bucket, with the full day set pre-seeded so sparse
//! data still produces a gap-free sequence. Coarser periods pass through
//! the remote rollup rows unmodified apart from key normalization.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::db::Database;
use crate::models::{BucketSummary, DateRange, MealRecord, PeriodKind, RollupStats};
use crate::timezone::TimezoneResolver;

use super::buckets::daily_bucket_keys;
use super::error::AggregateError;
use super::remote::{RemoteRollup, RollupRequest};

/// Maximum inclusive span, in days, for a daily-period range.
///
/// A cost guard for the locally-computed path, not a correctness rule.
pub const MAX_DAILY_RANGE_DAYS: i64 = 29;

/// Row cap passed to the remote rollup procedure
const ROLLUP_ROW_LIMIT: i64 = 366;

/// Pure pre-validation predicate for the range-size policy.
///
/// Callers use this to disable controls before ever invoking aggregation.
/// Only the daily period is guarded; coarser periods always pass.
pub fn is_range_allowed(period: PeriodKind, from: NaiveDate, to: NaiveDate) -> bool {
    match period {
        PeriodKind::Daily => from <= to && (to - from).num_days() + 1 <= MAX_DAILY_RANGE_DAYS,
        _ => true,
    }
}

/// Fold records into one bucket per calendar day of `range`, evaluated in `tz`.
///
/// Attribution is by local calendar date: a record whose UTC timestamp sits
/// near midnight may belong to the previous or next local day depending on
/// the zone offset, and is excluded entirely when its local date falls
/// outside the range. Output is ascending and gap-free.
pub fn summarize_daily(range: &DateRange, tz: Tz, records: &[MealRecord]) -> Vec<BucketSummary> {
    let mut buckets: BTreeMap<String, BucketSummary> = daily_bucket_keys(range)
        .into_iter()
        .map(|key| (key.clone(), BucketSummary::empty(key)))
        .collect();

    for record in records {
        let local_date = record.logged_at_utc.with_timezone(&tz).date_naive();
        if local_date < range.from || local_date > range.to {
            continue;
        }

        let key = local_date.format("%Y-%m-%d").to_string();
        if let Some(bucket) = buckets.get_mut(&key) {
            bucket.totals = bucket.totals.add(&record.nutrients.sanitized());
            bucket.meal_count += 1;
        }
    }

    buckets.into_values().collect()
}

/// Derive scalar totals from an emitted bucket sequence
pub fn rollup_stats(buckets: &[BucketSummary]) -> RollupStats {
    let mut stats = RollupStats::default();

    for bucket in buckets {
        stats.total_calories += bucket.totals.calories;
        stats.total_protein += bucket.totals.protein;
        stats.total_carbs += bucket.totals.carbs;
        stats.total_fat += bucket.totals.fat;
        stats.total_meals += bucket.meal_count;
        if bucket.meal_count > 0 {
            stats.days_logged += 1;
        }
    }

    if stats.days_logged > 0 {
        stats.avg_daily_calories = stats.total_calories / stats.days_logged as f64;
    }

    stats
}

/// Orchestrates summary computation across the two aggregation paths.
#[derive(Clone)]
pub struct Aggregator {
    database: Database,
    resolver: TimezoneResolver,
    remote: Arc<dyn RemoteRollup>,
    user_id: String,
}

impl Aggregator {
    pub fn new(
        database: Database,
        resolver: TimezoneResolver,
        remote: Arc<dyn RemoteRollup>,
        user_id: String,
    ) -> Self {
        Self {
            database,
            resolver,
            remote,
            user_id,
        }
    }

    /// Validate raw endpoint dates and summarize.
    ///
    /// Reversed ranges are rejected, not swapped.
    pub async fn summarize_dates(
        &self,
        period: PeriodKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BucketSummary>, AggregateError> {
        let range =
            DateRange::new(from, to).ok_or(AggregateError::ReversedRange { from, to })?;
        self.summarize(period, range).await
    }

    /// Produce the ordered bucket sequence for a period and range.
    pub async fn summarize(
        &self,
        period: PeriodKind,
        range: DateRange,
    ) -> Result<Vec<BucketSummary>, AggregateError> {
        if period == PeriodKind::Daily && range.inclusive_days() > MAX_DAILY_RANGE_DAYS {
            return Err(AggregateError::RangeTooLong {
                days: range.inclusive_days(),
                max: MAX_DAILY_RANGE_DAYS,
            });
        }

        match period {
            PeriodKind::Daily => self.summarize_daily_local(range),
            _ => self.summarize_remote(period, range).await,
        }
    }

    fn summarize_daily_local(
        &self,
        range: DateRange,
    ) -> Result<Vec<BucketSummary>, AggregateError> {
        let tz = self.resolver.effective_timezone();

        // UTC pre-filter padded a day each side; the local-date fold in
        // summarize_daily is the authoritative filter. No real zone offset
        // exceeds 24 hours, so nothing at the edges is mis-clipped.
        let start_utc = to_utc_midnight(range.from.checked_sub_days(Days::new(1)));
        let end_utc = to_utc_midnight(range.to.checked_add_days(Days::new(2)));

        let records = self
            .database
            .with_conn(|conn| MealRecord::list_between(conn, start_utc, end_utc))?;

        tracing::debug!(
            records = records.len(),
            tz = %tz,
            "computing daily summary for {}..{}",
            range.from,
            range.to
        );

        Ok(summarize_daily(&range, tz, &records))
    }

    async fn summarize_remote(
        &self,
        period: PeriodKind,
        range: DateRange,
    ) -> Result<Vec<BucketSummary>, AggregateError> {
        let request = RollupRequest {
            user_id: self.user_id.clone(),
            period: period.as_str().to_string(),
            start_date: range.from,
            end_date: range.to,
            limit: ROLLUP_ROW_LIMIT,
        };

        let rows = self.remote.fetch_rollup(&request).await?;

        let mut summaries: Vec<BucketSummary> = rows.into_iter().map(Into::into).collect();
        summaries.sort_by(|a, b| a.bucket_key.cmp(&b.bucket_key));
        Ok(summaries)
    }
}

fn to_utc_midnight(date: Option<NaiveDate>) -> chrono::DateTime<Utc> {
    // None only at the calendar limits
    let date = date.unwrap_or(NaiveDate::MIN);
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::remote::{RollupError, RollupRow};
    use crate::db::{migrations, Database};
    use crate::models::{MealRecordCreate, MealType, Nutrition};
    use crate::timezone::DeviceZoneSource;
    use async_trait::async_trait;
    use chrono::DateTime;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn range(from: &str, to: &str) -> DateRange {
        DateRange::new(d(from), d(to)).unwrap()
    }

    fn record(logged_at: &str, calories: f64) -> MealRecord {
        MealRecord {
            id: 0,
            logged_at_utc: DateTime::parse_from_rfc3339(logged_at)
                .unwrap()
                .with_timezone(&Utc),
            meal_type: MealType::Snack,
            nutrients: Nutrition {
                calories,
                protein: calories / 10.0,
                ..Nutrition::zero()
            },
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_daily_buckets_are_gap_free_with_no_records() {
        let buckets = summarize_daily(&range("2025-05-01", "2025-05-07"), Tz::UTC, &[]);
        assert_eq!(buckets.len(), 7);
        assert!(buckets.iter().all(|b| b.meal_count == 0));
        assert!(buckets.iter().all(|b| b.totals == Nutrition::zero()));
        assert_eq!(buckets[0].bucket_key, "2025-05-01");
        assert_eq!(buckets[6].bucket_key, "2025-05-07");
    }

    #[test]
    fn test_calories_are_conserved_across_buckets() {
        let records = vec![
            record("2025-05-01T08:00:00Z", 400.0),
            record("2025-05-01T19:00:00Z", 700.0),
            record("2025-05-03T12:00:00Z", 550.0),
        ];
        let buckets = summarize_daily(&range("2025-05-01", "2025-05-07"), Tz::UTC, &records);

        let total: f64 = buckets.iter().map(|b| b.totals.calories).sum();
        assert_eq!(total, 1650.0);
        let meals: i64 = buckets.iter().map(|b| b.meal_count).sum();
        assert_eq!(meals, 3);

        assert_eq!(buckets[0].totals.calories, 1100.0);
        assert_eq!(buckets[0].meal_count, 2);
        assert_eq!(buckets[2].totals.calories, 550.0);
    }

    #[test]
    fn test_effective_timezone_moves_record_between_buckets() {
        // 2025-01-01T23:30:00Z is still Jan 1 in Los Angeles (UTC-8) but
        // already Jan 2 in Kolkata (UTC+5:30).
        let records = vec![record("2025-01-01T23:30:00Z", 500.0)];
        let r = range("2025-01-01", "2025-01-02");

        let la = summarize_daily(&r, chrono_tz::America::Los_Angeles, &records);
        assert_eq!(la[0].meal_count, 1);
        assert_eq!(la[1].meal_count, 0);

        let kolkata = summarize_daily(&r, chrono_tz::Asia::Kolkata, &records);
        assert_eq!(kolkata[0].meal_count, 0);
        assert_eq!(kolkata[1].meal_count, 1);
    }

    #[test]
    fn test_record_outside_local_range_is_excluded() {
        // UTC timestamp falls inside the range's dates, but the local date
        // in Los Angeles is 2024-12-31, before the range start.
        let records = vec![record("2025-01-01T02:00:00Z", 300.0)];
        let buckets = summarize_daily(
            &range("2025-01-01", "2025-01-02"),
            chrono_tz::America::Los_Angeles,
            &records,
        );
        assert!(buckets.iter().all(|b| b.meal_count == 0));
    }

    #[test]
    fn test_record_outside_utc_range_but_inside_local_is_included() {
        // UTC date 2025-01-01 precedes the range, but local Kolkata date is
        // 2025-01-02, the only day in range.
        let records = vec![record("2025-01-01T23:30:00Z", 500.0)];
        let buckets = summarize_daily(
            &range("2025-01-02", "2025-01-02"),
            chrono_tz::Asia::Kolkata,
            &records,
        );
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].meal_count, 1);
    }

    #[test]
    fn test_dst_transition_still_yields_one_bucket_per_day() {
        // Spring forward in Los Angeles on 2025-03-09: a 23-hour local day
        let buckets = summarize_daily(
            &range("2025-03-08", "2025-03-10"),
            chrono_tz::America::Los_Angeles,
            &[],
        );
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[1].bucket_key, "2025-03-09");
    }

    #[test]
    fn test_range_guard_applies_to_daily_only() {
        // 29 inclusive days allowed, 30 rejected
        assert!(is_range_allowed(PeriodKind::Daily, d("2025-01-01"), d("2025-01-29")));
        assert!(!is_range_allowed(PeriodKind::Daily, d("2025-01-01"), d("2025-01-30")));

        assert!(is_range_allowed(PeriodKind::Weekly, d("2025-01-01"), d("2025-12-31")));
        assert!(is_range_allowed(PeriodKind::Monthly, d("2020-01-01"), d("2025-12-31")));
        assert!(is_range_allowed(PeriodKind::Yearly, d("2000-01-01"), d("2025-12-31")));
    }

    #[test]
    fn test_rollup_stats_math() {
        let buckets = vec![
            BucketSummary {
                bucket_key: "2025-05-01".to_string(),
                totals: Nutrition {
                    calories: 500.0,
                    ..Nutrition::zero()
                },
                meal_count: 2,
            },
            BucketSummary::empty("2025-05-02".to_string()),
            BucketSummary {
                bucket_key: "2025-05-03".to_string(),
                totals: Nutrition {
                    calories: 700.0,
                    ..Nutrition::zero()
                },
                meal_count: 1,
            },
        ];

        let stats = rollup_stats(&buckets);
        assert_eq!(stats.days_logged, 2);
        assert_eq!(stats.total_meals, 3);
        assert_eq!(stats.avg_daily_calories, 600.0);
    }

    #[test]
    fn test_rollup_stats_guard_divide_by_zero() {
        let buckets = vec![BucketSummary::empty("2025-05-01".to_string())];
        let stats = rollup_stats(&buckets);
        assert_eq!(stats.days_logged, 0);
        assert_eq!(stats.avg_daily_calories, 0.0);
    }

    // ------------------------------------------------------------------
    // Aggregator orchestration
    // ------------------------------------------------------------------

    struct FixedZone(&'static str);

    impl DeviceZoneSource for FixedZone {
        fn device_zone(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    struct FakeRollup {
        rows: Vec<RollupRow>,
        fail: bool,
    }

    #[async_trait]
    impl RemoteRollup for FakeRollup {
        async fn fetch_rollup(
            &self,
            _request: &RollupRequest,
        ) -> Result<Vec<RollupRow>, RollupError> {
            if self.fail {
                return Err(RollupError::Status(500));
            }
            Ok(self.rows.clone())
        }
    }

    fn test_aggregator(zone: &'static str, remote: FakeRollup) -> Aggregator {
        let database = Database::in_memory().unwrap();
        database
            .with_conn(|conn| migrations::run_migrations(conn))
            .unwrap();
        let resolver =
            TimezoneResolver::new(database.clone(), Arc::new(FixedZone(zone))).unwrap();
        Aggregator::new(database, resolver, Arc::new(remote), "local".to_string())
    }

    fn no_remote() -> FakeRollup {
        FakeRollup {
            rows: Vec::new(),
            fail: false,
        }
    }

    #[tokio::test]
    async fn test_daily_path_fetches_and_buckets_in_effective_zone() {
        let aggregator = test_aggregator("Asia/Kolkata", no_remote());

        aggregator
            .database
            .with_conn(|conn| {
                MealRecord::create(
                    conn,
                    &MealRecordCreate {
                        logged_at_utc: DateTime::parse_from_rfc3339("2025-01-01T23:30:00Z")
                            .unwrap()
                            .with_timezone(&Utc),
                        meal_type: MealType::Dinner,
                        nutrients: Nutrition {
                            calories: 800.0,
                            ..Nutrition::zero()
                        },
                        notes: None,
                    },
                )?;
                Ok(())
            })
            .unwrap();

        let buckets = aggregator
            .summarize_dates(PeriodKind::Daily, d("2025-01-02"), d("2025-01-03"))
            .await
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket_key, "2025-01-02");
        assert_eq!(buckets[0].meal_count, 1);
        assert_eq!(buckets[0].totals.calories, 800.0);
        assert_eq!(buckets[1].meal_count, 0);
    }

    #[tokio::test]
    async fn test_reversed_range_is_rejected_before_fetch() {
        let aggregator = test_aggregator("UTC", no_remote());
        let err = aggregator
            .summarize_dates(PeriodKind::Daily, d("2025-02-01"), d("2025-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::ReversedRange { .. }));
    }

    #[tokio::test]
    async fn test_over_limit_daily_range_is_rejected() {
        let aggregator = test_aggregator("UTC", no_remote());
        let err = aggregator
            .summarize_dates(PeriodKind::Daily, d("2025-01-01"), d("2025-01-30"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AggregateError::RangeTooLong { days: 30, max: MAX_DAILY_RANGE_DAYS }
        ));
    }

    #[tokio::test]
    async fn test_weekly_path_passes_rows_through_sorted() {
        let remote = FakeRollup {
            rows: vec![
                RollupRow {
                    bucket_key: "2025-03-10".to_string(),
                    totals: Nutrition {
                        calories: 8400.0,
                        ..Nutrition::zero()
                    },
                    meal_count: 15,
                },
                RollupRow {
                    bucket_key: "2025-03-03".to_string(),
                    totals: Nutrition {
                        calories: 9100.0,
                        ..Nutrition::zero()
                    },
                    meal_count: 18,
                },
            ],
            fail: false,
        };
        let aggregator = test_aggregator("UTC", remote);

        // No span limit on the remote path
        let buckets = aggregator
            .summarize_dates(PeriodKind::Weekly, d("2025-01-01"), d("2025-12-31"))
            .await
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket_key, "2025-03-03");
        assert_eq!(buckets[1].bucket_key, "2025-03-10");
        assert_eq!(buckets[0].totals.calories, 9100.0);
    }

    #[tokio::test]
    async fn test_remote_failure_surfaces_as_error_not_empty() {
        let aggregator = test_aggregator(
            "UTC",
            FakeRollup {
                rows: Vec::new(),
                fail: true,
            },
        );

        let err = aggregator
            .summarize_dates(PeriodKind::Monthly, d("2025-01-01"), d("2025-06-30"))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::RemoteRollup(_)));
    }
}

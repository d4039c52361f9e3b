//! Aggregation output types
//!
//! Bucket summaries are the unit of output for every reporting period;
//! rollup statistics are derived scalars for the totals card.

use serde::{Deserialize, Serialize};

use super::Nutrition;

/// One time-period slot (day/week/month/year) with summed nutrition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    /// Canonical start date of the bucket (day buckets: "YYYY-MM-DD")
    pub bucket_key: String,
    /// Nutrient totals across all records attributed to the bucket
    pub totals: Nutrition,
    /// Number of records attributed to the bucket
    pub meal_count: i64,
}

impl BucketSummary {
    /// An empty bucket for the given key
    pub fn empty(bucket_key: String) -> Self {
        Self {
            bucket_key,
            totals: Nutrition::zero(),
            meal_count: 0,
        }
    }
}

/// Scalar summary values derived from a bucket sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollupStats {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub total_meals: i64,
    /// Buckets with at least one record
    pub days_logged: i64,
    /// Total calories divided by days logged, 0 when nothing was logged
    pub avg_daily_calories: f64,
}

//! Data models
//!
//! Rust structs representing database entities and aggregation values.

mod bucket;
mod meal_record;
mod nutrition;
mod range;

pub use bucket::{BucketSummary, RollupStats};
pub use meal_record::{MealRecord, MealRecordCreate, MealRecordUpdate, MealType};
pub use nutrition::Nutrition;
pub use range::{DateRange, PeriodKind};

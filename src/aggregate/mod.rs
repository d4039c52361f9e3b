//! Nutrition aggregation engine
//!
//! Turns timestamped meal records into bucketed, gap-free nutrition
//! summaries. Daily summaries are computed locally in the user's effective
//! timezone; weekly/monthly/yearly summaries are delegated to a remote
//! rollup procedure.

pub mod buckets;
pub mod error;
pub mod remote;
pub mod session;
pub mod summary;

pub use buckets::daily_bucket_keys;
pub use error::AggregateError;
pub use remote::{HttpRollupClient, RemoteRollup, RollupError, RollupRequest, RollupRow};
pub use session::RequestTokens;
pub use summary::{
    is_range_allowed, rollup_stats, summarize_daily, Aggregator, MAX_DAILY_RANGE_DAYS,
};

//! Remote rollup procedure client
//!
//! Weekly, monthly, and yearly summaries come from a separately-deployed
//! aggregation procedure rather than being re-bucketed locally. This module
//! owns the wire contract: the request shape, the heterogeneous row key
//! normalization, and the HTTP client.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{BucketSummary, Nutrition};

/// Rollup delegation errors
#[derive(Debug, Error)]
pub enum RollupError {
    #[error("rollup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rollup endpoint returned status {0}")]
    Status(u16),

    #[error("malformed rollup row: {0}")]
    Malformed(String),
}

/// Parameters for one rollup invocation
#[derive(Debug, Clone, Serialize)]
pub struct RollupRequest {
    pub user_id: String,
    /// Period name: "weekly", "monthly", or "yearly"
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub limit: i64,
}

/// One pre-bucketed row from the rollup procedure.
///
/// The procedure names its key field after the period (`week_start`,
/// `month_start`, `year_start`, or plain `date`); the variants are
/// normalized onto `bucket_key` here so nothing downstream sees them.
#[derive(Debug, Clone, Deserialize)]
pub struct RollupRow {
    #[serde(
        alias = "date",
        alias = "week_start",
        alias = "month_start",
        alias = "year_start"
    )]
    pub bucket_key: String,
    #[serde(default)]
    pub totals: Nutrition,
    #[serde(default)]
    pub meal_count: i64,
}

impl From<RollupRow> for BucketSummary {
    fn from(row: RollupRow) -> Self {
        BucketSummary {
            bucket_key: row.bucket_key,
            totals: row.totals.sanitized(),
            meal_count: row.meal_count,
        }
    }
}

/// Remote aggregation procedure for non-daily periods.
///
/// Injectable so tests can run against an in-memory fake.
#[async_trait]
pub trait RemoteRollup: Send + Sync {
    async fn fetch_rollup(&self, request: &RollupRequest) -> Result<Vec<RollupRow>, RollupError>;
}

/// HTTP client for the deployed rollup procedure
pub struct HttpRollupClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRollupClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl RemoteRollup for HttpRollupClient {
    async fn fetch_rollup(&self, request: &RollupRequest) -> Result<Vec<RollupRow>, RollupError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RollupError::Status(status.as_u16()));
        }

        let rows = response.json::<Vec<RollupRow>>().await?;
        Ok(rows)
    }
}

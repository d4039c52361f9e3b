//! mealscope status tool
//!
//! Runtime status information: build metadata, database health, and the
//! current timezone state.

use serde::Serialize;

use crate::build_info::BuildInfo;
use crate::db::{migrations, Database};
use crate::models::MealRecord;
use crate::timezone::{TimezoneResolver, TimezoneState};

/// Full status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub build: BuildInfo,
    pub database: DatabaseStatus,
    pub timezone: TimezoneState,
}

/// Database health snapshot
#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub schema_version: i32,
    pub meal_records: i64,
}

/// Collect current service status
pub fn get_status(db: &Database, resolver: &TimezoneResolver) -> Result<StatusResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let schema_version = migrations::get_schema_version(&conn)
        .map_err(|e| format!("Failed to read schema version: {}", e))?;
    let meal_records =
        MealRecord::count(&conn).map_err(|e| format!("Failed to count meal records: {}", e))?;

    let timezone = resolver
        .state()
        .map_err(|e| format!("Failed to read timezone state: {}", e))?;

    Ok(StatusResponse {
        build: BuildInfo::current(),
        database: DatabaseStatus {
            schema_version,
            meal_records,
        },
        timezone,
    })
}

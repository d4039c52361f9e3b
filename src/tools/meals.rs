//! Meal record MCP tools
//!
//! Tools for logging and managing meal records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::models::{MealRecord, MealRecordCreate, MealRecordUpdate, MealType, Nutrition};

/// Response for log_meal and update_meal
#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub id: i64,
    pub logged_at_utc: String,
    pub meal_type: String,
    pub nutrients: Nutrition,
    pub notes: Option<String>,
}

/// Response for list_meals
#[derive(Debug, Serialize)]
pub struct ListMealsResponse {
    pub meals: Vec<MealResponse>,
    pub total: i64,
}

impl From<MealRecord> for MealResponse {
    fn from(record: MealRecord) -> Self {
        Self {
            id: record.id,
            logged_at_utc: record.logged_at_utc.to_rfc3339(),
            meal_type: record.meal_type.as_str().to_string(),
            nutrients: record.nutrients,
            notes: record.notes,
        }
    }
}

/// Parse an RFC3339 timestamp into UTC
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp {:?} (expected RFC3339): {}", s, e))
}

/// Log a meal record
pub fn log_meal(
    db: &Database,
    logged_at_utc: Option<&str>,
    meal_type: &str,
    nutrients: Nutrition,
    notes: Option<String>,
) -> Result<MealResponse, String> {
    let logged_at_utc = match logged_at_utc {
        Some(s) => parse_timestamp(s)?,
        None => Utc::now(),
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let record = MealRecord::create(
        &conn,
        &MealRecordCreate {
            logged_at_utc,
            meal_type: MealType::from_str(meal_type),
            nutrients,
            notes,
        },
    )
    .map_err(|e| format!("Failed to log meal: {}", e))?;

    Ok(record.into())
}

/// Get a meal record by ID
pub fn get_meal(db: &Database, id: i64) -> Result<Option<MealResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let record = MealRecord::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get meal: {}", e))?;

    Ok(record.map(Into::into))
}

/// List the most recent meal records
pub fn list_meals(db: &Database, limit: i64) -> Result<ListMealsResponse, String> {
    let limit = limit.clamp(1, 200);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let records = MealRecord::list_recent(&conn, limit)
        .map_err(|e| format!("Failed to list meals: {}", e))?;
    let total = MealRecord::count(&conn).map_err(|e| format!("Failed to count meals: {}", e))?;

    Ok(ListMealsResponse {
        meals: records.into_iter().map(Into::into).collect(),
        total,
    })
}

/// Update a meal record (timestamp changes are explicit user edits)
pub fn update_meal(
    db: &Database,
    id: i64,
    logged_at_utc: Option<&str>,
    meal_type: Option<&str>,
    nutrients: Option<Nutrition>,
    notes: Option<String>,
) -> Result<Option<MealResponse>, String> {
    let logged_at_utc = match logged_at_utc {
        Some(s) => Some(parse_timestamp(s)?),
        None => None,
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let data = MealRecordUpdate {
        logged_at_utc,
        meal_type: meal_type.map(MealType::from_str),
        nutrients,
        notes,
    };

    let updated = MealRecord::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update meal: {}", e))?;

    Ok(updated.map(Into::into))
}

/// Delete a meal record
pub fn delete_meal(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    MealRecord::delete(&conn, id).map_err(|e| format!("Failed to delete meal: {}", e))
}

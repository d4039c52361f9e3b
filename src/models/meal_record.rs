//! Meal record model
//!
//! Represents a single logged meal: a UTC timestamp plus nutrient totals
//! as consumed. Timestamps are stored as RFC3339 UTC strings so that
//! lexicographic comparison in SQL matches chronological order.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::Nutrition;
use crate::db::DbResult;

/// Storage format for UTC timestamps
const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Meal type enum
///
/// Unrecognized strings are passed through rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Other(String),
}

impl MealType {
    pub fn as_str(&self) -> &str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Other(s) => s,
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "breakfast" => MealType::Breakfast,
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            "snack" => MealType::Snack,
            _ => MealType::Other(s.to_string()),
        }
    }
}

impl From<String> for MealType {
    fn from(s: String) -> Self {
        MealType::from_str(&s)
    }
}

impl From<MealType> for String {
    fn from(m: MealType) -> Self {
        m.as_str().to_string()
    }
}

/// A logged meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: i64,
    /// When the meal was logged, in UTC. Mutable only via explicit user edit.
    pub logged_at_utc: DateTime<Utc>,
    pub meal_type: MealType,
    pub nutrients: Nutrition,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a meal record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRecordCreate {
    pub logged_at_utc: DateTime<Utc>,
    pub meal_type: MealType,
    pub nutrients: Nutrition,
    pub notes: Option<String>,
}

/// Data for updating a meal record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealRecordUpdate {
    pub logged_at_utc: Option<DateTime<Utc>>,
    pub meal_type: Option<MealType>,
    pub nutrients: Option<Nutrition>,
    pub notes: Option<String>,
}

impl MealRecord {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let meal_type_str: String = row.get("meal_type")?;
        let logged_at_str: String = row.get("logged_at_utc")?;
        let logged_at_utc = DateTime::parse_from_rfc3339(&logged_at_str)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: row.get("id")?,
            logged_at_utc,
            meal_type: MealType::from_str(&meal_type_str),
            nutrients: Nutrition {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fat: row.get("fat")?,
                fiber: row.get("fiber")?,
                sodium: row.get("sodium")?,
            },
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Create a new meal record
    pub fn create(conn: &Connection, data: &MealRecordCreate) -> DbResult<Self> {
        let nutrients = data.nutrients.sanitized();

        conn.execute(
            r#"
            INSERT INTO meal_records (
                logged_at_utc, meal_type,
                calories, protein, carbs, fat, fiber, sodium,
                notes
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                data.logged_at_utc.format(UTC_FORMAT).to_string(),
                data.meal_type.as_str(),
                nutrients.calories,
                nutrients.protein,
                nutrients.carbs,
                nutrients.fat,
                nutrients.fiber,
                nutrients.sodium,
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a meal record by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meal_records WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List records with `start_utc <= logged_at_utc < end_utc`, ascending.
    ///
    /// Callers aggregating by local date must pad this UTC window generously
    /// (at least a day each side) and filter authoritatively on the local
    /// calendar date afterwards.
    pub fn list_between(
        conn: &Connection,
        start_utc: DateTime<Utc>,
        end_utc: DateTime<Utc>,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM meal_records
             WHERE logged_at_utc >= ?1 AND logged_at_utc < ?2
             ORDER BY logged_at_utc, id",
        )?;

        let records = stmt
            .query_map(
                params![
                    start_utc.format(UTC_FORMAT).to_string(),
                    end_utc.format(UTC_FORMAT).to_string(),
                ],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// List the most recent records
    pub fn list_recent(conn: &Connection, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM meal_records ORDER BY logged_at_utc DESC, id DESC LIMIT ?1",
        )?;

        let records = stmt
            .query_map([limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Update a meal record
    pub fn update(conn: &Connection, id: i64, data: &MealRecordUpdate) -> DbResult<Option<Self>> {
        let existing = Self::get_by_id(conn, id)?;
        if existing.is_none() {
            return Ok(None);
        }

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(logged_at) = data.logged_at_utc {
            updates.push(format!("logged_at_utc = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(logged_at.format(UTC_FORMAT).to_string()));
        }
        if let Some(ref meal_type) = data.meal_type {
            updates.push(format!("meal_type = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(meal_type.as_str().to_string()));
        }
        if let Some(ref nutrients) = data.nutrients {
            let nutrients = nutrients.sanitized();
            updates.push(format!("calories = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(nutrients.calories));
            updates.push(format!("protein = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(nutrients.protein));
            updates.push(format!("carbs = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(nutrients.carbs));
            updates.push(format!("fat = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(nutrients.fat));
            updates.push(format!("fiber = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(nutrients.fiber));
            updates.push(format!("sodium = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(nutrients.sodium));
        }
        if let Some(ref notes) = data.notes {
            updates.push(format!("notes = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(notes.clone()));
        }

        if updates.is_empty() {
            return Ok(existing);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE meal_records SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete a meal record
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meal_records WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Count all meal records
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM meal_records", [], |row| row.get(0))?;
        Ok(count)
    }
}

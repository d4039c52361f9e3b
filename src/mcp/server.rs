//! mealscope MCP server implementation
//!
//! Implements the MCP server with all mealscope tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregator, RequestTokens};
use crate::db::Database;
use crate::models::Nutrition;
use crate::timezone::TimezoneResolver;
use crate::tools::{meals, status, summaries, timezone};

/// mealscope MCP service
#[derive(Clone)]
pub struct MealscopeService {
    database: Database,
    resolver: TimezoneResolver,
    aggregator: Aggregator,
    /// Tokens for stale-summary suppression across rapid requests
    summary_tokens: Arc<RequestTokens>,
    tool_router: ToolRouter<MealscopeService>,
}

impl MealscopeService {
    pub fn new(database: Database, resolver: TimezoneResolver, aggregator: Aggregator) -> Self {
        Self {
            database,
            resolver,
            aggregator,
            summary_tokens: Arc::new(RequestTokens::new()),
            tool_router: Self::tool_router(),
        }
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

/// Nutrient values for a meal; omitted fields default to 0
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct NutrientsParam {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sodium: f64,
}

impl From<NutrientsParam> for Nutrition {
    fn from(p: NutrientsParam) -> Self {
        Nutrition {
            calories: p.calories,
            protein: p.protein,
            carbs: p.carbs,
            fat: p.fat,
            fiber: p.fiber,
            sodium: p.sodium,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogMealParams {
    /// When the meal was logged, RFC3339 UTC (defaults to now)
    pub logged_at_utc: Option<String>,
    /// breakfast, lunch, dinner, snack, or a free-form label
    pub meal_type: String,
    /// Nutrient values as consumed; omitted fields default to 0
    #[serde(default)]
    pub nutrients: NutrientsParam,
    /// Optional notes
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMealParams {
    /// Meal record ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMealsParams {
    /// Maximum results (default 50, max 200)
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMealParams {
    /// Meal record ID
    pub id: i64,
    /// New logged-at timestamp, RFC3339 UTC (explicit user edit)
    pub logged_at_utc: Option<String>,
    /// New meal type
    pub meal_type: Option<String>,
    /// Replacement nutrient values; replaces all six fields when provided
    pub nutrients: Option<NutrientsParam>,
    /// New notes
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteMealParams {
    /// Meal record ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NutritionSummaryParams {
    /// Reporting period: daily, weekly, monthly, or yearly
    pub period: String,
    /// Range start (YYYY-MM-DD, inclusive)
    pub start_date: String,
    /// Range end (YYYY-MM-DD, inclusive)
    pub end_date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetTimezoneParams {
    /// IANA zone name, e.g. "America/Los_Angeles"
    pub timezone: String,
}

#[derive(Debug, Serialize)]
struct SupersededResponse {
    superseded: bool,
    message: &'static str,
}

fn to_json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl MealscopeService {
    // --- Status ---

    #[tool(description = "Get the current status of the mealscope service including build info, database status, and timezone state")]
    fn mealscope_status(&self) -> Result<CallToolResult, McpError> {
        let result = status::get_status(&self.database, &self.resolver)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json_result(&result)
    }

    // --- Meals ---

    #[tool(description = "Log a meal with nutrient values (calories, protein, carbs, fat, fiber, sodium). Timestamp defaults to now.")]
    fn log_meal(&self, Parameters(p): Parameters<LogMealParams>) -> Result<CallToolResult, McpError> {
        let result = meals::log_meal(
            &self.database,
            p.logged_at_utc.as_deref(),
            &p.meal_type,
            p.nutrients.into(),
            p.notes,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json_result(&result)
    }

    #[tool(description = "Get a meal record by ID")]
    fn get_meal(&self, Parameters(p): Parameters<GetMealParams>) -> Result<CallToolResult, McpError> {
        let result = meals::get_meal(&self.database, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(meal) => to_json_result(&meal),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "Meal not found", "id": {}}}"#,
                p.id
            ))])),
        }
    }

    #[tool(description = "List the most recent meal records")]
    fn list_meals(&self, Parameters(p): Parameters<ListMealsParams>) -> Result<CallToolResult, McpError> {
        let result = meals::list_meals(&self.database, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json_result(&result)
    }

    #[tool(description = "Update a meal record. Changing logged_at_utc moves the meal between summary buckets.")]
    fn update_meal(&self, Parameters(p): Parameters<UpdateMealParams>) -> Result<CallToolResult, McpError> {
        let result = meals::update_meal(
            &self.database,
            p.id,
            p.logged_at_utc.as_deref(),
            p.meal_type.as_deref(),
            p.nutrients.map(Into::into),
            p.notes,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(meal) => to_json_result(&meal),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "Meal not found", "id": {}}}"#,
                p.id
            ))])),
        }
    }

    #[tool(description = "Delete a meal record")]
    fn delete_meal(&self, Parameters(p): Parameters<DeleteMealParams>) -> Result<CallToolResult, McpError> {
        let deleted = meals::delete_meal(&self.database, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            r#"{{"deleted": {}, "id": {}}}"#,
            deleted, p.id
        ))]))
    }

    // --- Summaries ---

    #[tool(description = "Compute a nutrition summary: one bucket per day/week/month/year across the date range, gap-free and ascending, plus rollup statistics. Daily ranges are limited to 29 days; use check_summary_range to pre-validate.")]
    async fn nutrition_summary(&self, Parameters(p): Parameters<NutritionSummaryParams>) -> Result<CallToolResult, McpError> {
        let result = summaries::nutrition_summary(
            &self.aggregator,
            &self.resolver,
            &self.summary_tokens,
            &p.period,
            &p.start_date,
            &p.end_date,
        )
        .await
        .map_err(|e| McpError::internal_error(e, None))?;

        match result {
            Some(summary) => to_json_result(&summary),
            None => to_json_result(&SupersededResponse {
                superseded: true,
                message: "A newer summary request was issued; this result was discarded",
            }),
        }
    }

    #[tool(description = "Check whether a date range is allowed for a reporting period without running the aggregation (daily ranges are capped at 29 days)")]
    fn check_summary_range(&self, Parameters(p): Parameters<NutritionSummaryParams>) -> Result<CallToolResult, McpError> {
        let result = summaries::check_summary_range(&p.period, &p.start_date, &p.end_date)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json_result(&result)
    }

    // --- Timezone ---

    #[tool(description = "Get the current timezone state: stored zone, auto-detect flag, and the effective zone summaries will use")]
    fn get_timezone(&self) -> Result<CallToolResult, McpError> {
        let result = timezone::get_timezone(&self.resolver)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json_result(&result)
    }

    #[tool(description = "Override the timezone used for daily summaries (disables auto-detect)")]
    fn set_timezone(&self, Parameters(p): Parameters<SetTimezoneParams>) -> Result<CallToolResult, McpError> {
        let result = timezone::set_timezone(&self.resolver, &p.timezone)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json_result(&result)
    }

    #[tool(description = "Re-enable timezone auto-detect so summaries follow the device zone")]
    fn reset_timezone_to_auto(&self) -> Result<CallToolResult, McpError> {
        let result = timezone::reset_timezone_to_auto(&self.resolver)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for MealscopeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mealscope".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("mealscope".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "mealscope - meal logging and timezone-aware nutrition summaries. \
                 Meals: log_meal/get_meal/list_meals/update_meal/delete_meal. \
                 Summaries: nutrition_summary (period: daily/weekly/monthly/yearly + date range), \
                 check_summary_range to pre-validate a range (daily is capped at 29 days). \
                 Timezone: get_timezone/set_timezone/reset_timezone_to_auto; daily summaries \
                 bucket meals by local calendar date in the effective zone. \
                 Status: mealscope_status."
                    .into(),
            ),
        }
    }
}

//! mealscope tools module
//!
//! MCP tool implementations.

pub mod meals;
pub mod status;
pub mod summaries;
pub mod timezone;

//! mealscope library
//!
//! Meal logging and timezone-aware nutrition aggregation.

pub mod aggregate;
pub mod build_info;
pub mod db;
pub mod mcp;
pub mod models;
pub mod timezone;
pub mod tools;

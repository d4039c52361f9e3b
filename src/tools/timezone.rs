//! Timezone MCP tools
//!
//! Thin wrappers over the resolver's read/write contract.

use crate::timezone::{TimezoneResolver, TimezoneState};

/// Current timezone state plus the live effective zone
pub fn get_timezone(resolver: &TimezoneResolver) -> Result<TimezoneState, String> {
    resolver
        .state()
        .map_err(|e| format!("Failed to read timezone state: {}", e))
}

/// Override the timezone, disabling auto-detect
pub fn set_timezone(resolver: &TimezoneResolver, zone: &str) -> Result<TimezoneState, String> {
    resolver
        .set_timezone(zone)
        .map_err(|e| format!("Failed to set timezone: {}", e))?;
    get_timezone(resolver)
}

/// Re-enable device auto-detect
pub fn reset_timezone_to_auto(resolver: &TimezoneResolver) -> Result<TimezoneState, String> {
    resolver
        .reset_to_auto()
        .map_err(|e| format!("Failed to reset timezone: {}", e))?;
    get_timezone(resolver)
}

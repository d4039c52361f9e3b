//! Effective timezone resolution
//!
//! Every aggregation buckets records by local calendar date, so it needs an
//! IANA zone to project UTC timestamps into. The zone is either an explicit
//! user override or the device zone, auto-detected live on every call so it
//! tracks travel without user action. State survives restarts via the
//! settings table.

use std::str::FromStr;
use std::sync::Arc;

use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::{Database, DbResult};

const KEY_TIMEZONE: &str = "timezone";
const KEY_AUTO_DETECT: &str = "timezone_auto";

/// Source of the device-resolved IANA zone.
///
/// Injectable so tests can simulate zone changes without touching the host.
pub trait DeviceZoneSource: Send + Sync {
    /// The device's current IANA zone name, if it can be determined
    fn device_zone(&self) -> Option<String>;
}

/// Production zone source backed by the OS timezone database
pub struct SystemZoneSource;

impl DeviceZoneSource for SystemZoneSource {
    fn device_zone(&self) -> Option<String> {
        iana_time_zone::get_timezone().ok()
    }
}

/// Persisted timezone state, for display and auditing
#[derive(Debug, Clone, Serialize)]
pub struct TimezoneState {
    /// Stored zone string; a snapshot only while auto-detect is active
    pub timezone: String,
    pub is_auto_detect: bool,
    /// The zone aggregation would use right now
    pub effective: String,
}

/// Resolves the effective IANA timezone for bucketing.
#[derive(Clone)]
pub struct TimezoneResolver {
    database: Database,
    device: Arc<dyn DeviceZoneSource>,
}

impl TimezoneResolver {
    /// Create a resolver, seeding persisted state from the device zone on
    /// first use.
    pub fn new(database: Database, device: Arc<dyn DeviceZoneSource>) -> DbResult<Self> {
        let resolver = Self { database, device };

        let conn = resolver.database.get_conn()?;
        if get_setting(&conn, KEY_AUTO_DETECT)?.is_none() {
            let zone = resolver.device_zone_or_utc();
            set_setting(&conn, KEY_TIMEZONE, &zone)?;
            set_setting(&conn, KEY_AUTO_DETECT, "1")?;
        }

        Ok(resolver)
    }

    /// The zone currently governing local-date computation.
    ///
    /// While auto-detect is active the device zone is re-resolved on every
    /// call, never cached. Unparseable or unresolvable zones fall back to
    /// UTC so aggregation always produces a result.
    pub fn effective_timezone(&self) -> Tz {
        let stored = self
            .database
            .with_conn(|conn| {
                Ok((
                    get_setting(conn, KEY_AUTO_DETECT)?,
                    get_setting(conn, KEY_TIMEZONE)?,
                ))
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to read timezone settings: {}", e);
                (None, None)
            });

        let (auto_flag, timezone) = stored;
        let is_auto = auto_flag.as_deref().map(|v| v == "1").unwrap_or(true);

        let name = if is_auto {
            self.device_zone_or_utc()
        } else {
            timezone.unwrap_or_else(|| "UTC".to_string())
        };

        parse_zone_or_utc(&name)
    }

    /// Store an explicit zone override and clear auto-detect.
    ///
    /// The string is not validated here; a bad zone surfaces later as the
    /// UTC fallback in `effective_timezone`.
    pub fn set_timezone(&self, zone: &str) -> DbResult<()> {
        let conn = self.database.get_conn()?;
        set_setting(&conn, KEY_TIMEZONE, zone)?;
        set_setting(&conn, KEY_AUTO_DETECT, "0")?;
        Ok(())
    }

    /// Restore auto-detect, snapshotting the current device zone for display
    pub fn reset_to_auto(&self) -> DbResult<()> {
        let zone = self.device_zone_or_utc();
        let conn = self.database.get_conn()?;
        set_setting(&conn, KEY_TIMEZONE, &zone)?;
        set_setting(&conn, KEY_AUTO_DETECT, "1")?;
        Ok(())
    }

    /// Current persisted state plus the live effective zone
    pub fn state(&self) -> DbResult<TimezoneState> {
        let (timezone, auto_flag) = self.database.with_conn(|conn| {
            Ok((
                get_setting(conn, KEY_TIMEZONE)?,
                get_setting(conn, KEY_AUTO_DETECT)?,
            ))
        })?;

        Ok(TimezoneState {
            timezone: timezone.unwrap_or_else(|| "UTC".to_string()),
            is_auto_detect: auto_flag.as_deref().map(|v| v == "1").unwrap_or(true),
            effective: self.effective_timezone().name().to_string(),
        })
    }

    fn device_zone_or_utc(&self) -> String {
        match self.device.device_zone() {
            Some(zone) => zone,
            None => {
                tracing::warn!("device timezone could not be determined, falling back to UTC");
                "UTC".to_string()
            }
        }
    }
}

fn parse_zone_or_utc(name: &str) -> Tz {
    match Tz::from_str(name) {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("unrecognized timezone {:?}, falling back to UTC", name);
            Tz::UTC
        }
    }
}

fn get_setting(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_setting(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use std::sync::Mutex;

    /// Simulated device zone that tests can change between calls
    struct FakeZoneSource {
        zone: Mutex<Option<String>>,
    }

    impl FakeZoneSource {
        fn new(zone: &str) -> Arc<Self> {
            Arc::new(Self {
                zone: Mutex::new(Some(zone.to_string())),
            })
        }

        fn set(&self, zone: Option<&str>) {
            *self.zone.lock().unwrap() = zone.map(|s| s.to_string());
        }
    }

    impl DeviceZoneSource for FakeZoneSource {
        fn device_zone(&self) -> Option<String> {
            self.zone.lock().unwrap().clone()
        }
    }

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| migrations::run_migrations(conn))
            .unwrap();
        db
    }

    #[test]
    fn test_auto_detect_tracks_device_zone_live() {
        let device = FakeZoneSource::new("America/Los_Angeles");
        let resolver = TimezoneResolver::new(test_db(), device.clone()).unwrap();

        assert_eq!(
            resolver.effective_timezone(),
            chrono_tz::America::Los_Angeles
        );

        // Simulated travel: no re-initialization, next call sees the new zone
        device.set(Some("Asia/Kolkata"));
        assert_eq!(resolver.effective_timezone(), chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn test_override_pins_zone_regardless_of_device() {
        let device = FakeZoneSource::new("America/Los_Angeles");
        let resolver = TimezoneResolver::new(test_db(), device.clone()).unwrap();

        resolver.set_timezone("Europe/Berlin").unwrap();
        device.set(Some("Asia/Kolkata"));

        assert_eq!(resolver.effective_timezone(), chrono_tz::Europe::Berlin);

        let state = resolver.state().unwrap();
        assert!(!state.is_auto_detect);
        assert_eq!(state.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_reset_to_auto_restores_live_resolution() {
        let device = FakeZoneSource::new("America/Los_Angeles");
        let resolver = TimezoneResolver::new(test_db(), device.clone()).unwrap();

        resolver.set_timezone("Europe/Berlin").unwrap();
        resolver.reset_to_auto().unwrap();
        device.set(Some("Asia/Tokyo"));

        assert_eq!(resolver.effective_timezone(), chrono_tz::Asia::Tokyo);
        assert!(resolver.state().unwrap().is_auto_detect);
    }

    #[test]
    fn test_state_survives_resolver_recreation() {
        let db = test_db();
        let device = FakeZoneSource::new("America/Los_Angeles");

        let resolver = TimezoneResolver::new(db.clone(), device.clone()).unwrap();
        resolver.set_timezone("Europe/Berlin").unwrap();
        drop(resolver);

        let resolver = TimezoneResolver::new(db, device).unwrap();
        assert_eq!(resolver.effective_timezone(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_unresolvable_device_zone_falls_back_to_utc() {
        let device = FakeZoneSource::new("America/Los_Angeles");
        let resolver = TimezoneResolver::new(test_db(), device.clone()).unwrap();

        device.set(None);
        assert_eq!(resolver.effective_timezone(), Tz::UTC);
    }

    #[test]
    fn test_invalid_override_falls_back_to_utc() {
        let device = FakeZoneSource::new("America/Los_Angeles");
        let resolver = TimezoneResolver::new(test_db(), device).unwrap();

        // Stored without validation; the fallback happens at use time
        resolver.set_timezone("Mars/Olympus_Mons").unwrap();
        assert_eq!(resolver.effective_timezone(), Tz::UTC);
    }
}

//! Sentinel instants and UTC tagging.
//!
//! Every planner timestamp is a UTC-tagged wall-clock reading. A due date of
//! "Monday 08:15" is stored as `08:15Z` no matter where the device is, so tagging a
//! value as UTC must never shift it: shifting could move a due date to another day.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

fn utc(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    milli: u32,
) -> DateTime<Utc> {
    // Only called with literal, in-range components.
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, minute, second, milli))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_default()
}

/// "Not set". Default for `Updated`, `DateCreated`, reminders, end times and
/// semester bounds.
pub fn unassigned() -> DateTime<Utc> {
    utc(1970, 1, 1, 0, 0, 0, 0)
}

/// Date of an item that has no due date. The time component is irrelevant.
pub fn no_due_date() -> DateTime<Utc> {
    utc(1999, 12, 31, 0, 0, 0, 0)
}

/// Smallest instant the server can persist.
pub fn min_persisted() -> DateTime<Utc> {
    utc(1753, 1, 1, 0, 0, 0, 0)
}

/// Largest instant the server can persist.
pub fn max_persisted() -> DateTime<Utc> {
    utc(9999, 12, 31, 23, 59, 59, 997)
}

/// Premium expiration of an account that never expires.
pub fn lifetime_premium() -> DateTime<Utc> {
    max_persisted()
}

/// Older servers wrote the minimum persisted date instead of [`unassigned`], so both
/// count as "not set".
pub fn is_unassigned(date: DateTime<Utc>) -> bool {
    date == unassigned() || date == min_persisted()
}

pub fn has_due_date(date: DateTime<Utc>) -> bool {
    date != no_due_date()
}

/// Tags a wall-clock reading as UTC without converting it.
pub fn mark_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

/// Parses a wire timestamp. Values carrying a non-zero offset keep their wall-clock
/// reading and are re-tagged as UTC; values without an offset are taken as UTC.
pub fn parse_wall_clock(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Ok(mark_utc(with_offset.naive_local()));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(mark_utc)
}

pub fn format_wall_clock(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Serde adapter used by every timestamp field of the model.
pub mod wall_clock {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_wall_clock(date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_wall_clock(&raw).map_err(serde::de::Error::custom)
    }
}

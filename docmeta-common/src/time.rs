//! Timestamp utilities
//!
//! SQLite's `CURRENT_TIMESTAMP` stores UTC as `YYYY-MM-DD HH:MM:SS` with no
//! offset, so stored timestamps are handled as `NaiveDateTime` in UTC.

use chrono::{NaiveDateTime, Utc};

/// Current UTC time in the form SQLite stores it
pub fn now_naive() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Render a stored timestamp as RFC 3339 (UTC)
pub fn to_rfc3339(ts: &NaiveDateTime) -> String {
    ts.and_utc().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

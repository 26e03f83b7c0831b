//! Storage key conventions and fixed-timezone dates
//!
//! Attendance records are keyed `{prefix}{date}:{uid}` and binding records
//! `{prefix}{userId}`. The date is always the calendar date in Asia/Shanghai
//! regardless of where the job runs, so a run triggered just after UTC
//! midnight still dedups against the correct game-server day.

use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;

/// Date format used inside storage keys
const KEY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's calendar date in the game server's timezone.
pub fn today_shanghai() -> NaiveDate {
    Utc::now().with_timezone(&Shanghai).date_naive()
}

/// Dedup key for one character's attendance on one date.
pub fn attendance_key(prefix: &str, date: NaiveDate, uid: &str) -> String {
    format!("{prefix}{}:{uid}", date.format(KEY_DATE_FORMAT))
}

/// Key for an account's persisted binding list.
pub fn bindings_key(prefix: &str, user_id: &str) -> String {
    format!("{prefix}{user_id}")
}

/// Extract the date segment from a storage key.
///
/// The date is the first `:`-separated segment that parses as `%Y-%m-%d`.
/// Keys without one (binding records) yield `None` and are never swept.
pub fn extract_date(key: &str) -> Option<NaiveDate> {
    key.split(':')
        .find_map(|segment| NaiveDate::parse_from_str(segment, KEY_DATE_FORMAT).ok())
}

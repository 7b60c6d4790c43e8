pub mod admin_log;
pub mod database;
pub mod examiners;
pub mod protocols;
pub mod reminders;
pub mod users;

use chrono::{NaiveDate, NaiveDateTime, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Timestamps are kept as text in the same shape SQLite's CURRENT_TIMESTAMP
/// produces, so comparisons inside queries stay lexicographic.
pub fn format_timestamp(time: NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

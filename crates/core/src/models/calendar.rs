use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const UNKNOWN_DATE: &str = "Unknown Date";
pub const INVALID_DATE: &str = "Invalid Date";

/// Formats a date as zero-padded `YYYY-MM-DD` from its calendar components.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `"Thursday, Jun 12"`
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %b %-d").to_string()
}

/// Parses the date portion of a bare date or an ISO date-time string.
///
/// Date-times are never shifted to another zone; `2025-06-12T23:30:00-05:00`
/// is the 12th, not the 13th.
pub fn parse_date_portion(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }

    // Fall back to the leading `YYYY-MM-DD` of anything longer
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, DATE_FORMAT).ok())
}

/// Parses an RFC 3339 timestamp, or a zone-less one read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|dt| dt.and_utc())
}

/// A calendar date as received from the roster API.
///
/// The API is not strict about date fields, so decoding never fails: a
/// missing or `null` value becomes `Missing` and anything unparseable is
/// kept verbatim as `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CalendarDate {
    Valid(NaiveDate),
    #[default]
    Missing,
    Invalid(String),
}

impl CalendarDate {
    pub fn parse(raw: &str) -> Self {
        match parse_date_portion(raw) {
            Some(date) => CalendarDate::Valid(date),
            None => CalendarDate::Invalid(raw.to_string()),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            CalendarDate::Valid(date) => Some(*date),
            _ => None,
        }
    }

    /// Sortable key: `YYYY-MM-DD` for valid dates, empty otherwise.
    pub fn key(&self) -> String {
        self.date().map(format_date).unwrap_or_default()
    }

    /// Long form for display, with a placeholder for bad data.
    pub fn display(&self) -> String {
        match self {
            CalendarDate::Valid(date) => format_long_date(*date),
            CalendarDate::Missing => UNKNOWN_DATE.to_string(),
            CalendarDate::Invalid(_) => INVALID_DATE.to_string(),
        }
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        CalendarDate::Valid(date)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarDate::Valid(date) => write!(f, "{}", format_date(*date)),
            CalendarDate::Missing => f.write_str(UNKNOWN_DATE),
            CalendarDate::Invalid(_) => f.write_str(INVALID_DATE),
        }
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CalendarDate::Valid(date) => serializer.serialize_str(&format_date(*date)),
            CalendarDate::Missing => serializer.serialize_none(),
            CalendarDate::Invalid(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::Null => CalendarDate::Missing,
            serde_json::Value::String(raw) if raw.trim().is_empty() => CalendarDate::Missing,
            serde_json::Value::String(raw) => CalendarDate::parse(&raw),
            other => CalendarDate::Invalid(other.to_string()),
        })
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::errors::{RosterError, RosterResult};
use crate::models::calendar::{CalendarDate, parse_timestamp};
use crate::models::status::{DateStatus, DutyStatus, PriorityHint};

/// Sort key used for assignments without a start time.
pub const DEFAULT_START_TIME: &str = "00:00";

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match RawId::deserialize(deserializer)? {
                    RawId::Text(id) => Ok(Self(id)),
                    RawId::Number(id) => Ok(Self(id.to_string())),
                }
            }
        }
    };
}

// The API hands out ids as numbers or strings depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

opaque_id!(
    /// Identifier of a duty assignment.
    DutyId
);

opaque_id!(
    /// Identifier of a date record, unique only within its assignment.
    DateId
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyDateRecord {
    pub id: DateId,
    #[serde(default)]
    pub date: CalendarDate,
    #[serde(default, deserialize_with = "lenient")]
    pub status: DateStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub decline_reason: Option<String>,
}

/// One duty assignment as listed by the roster API.
///
/// Decoding is lenient field by field: a malformed value falls back to its
/// default (`Unknown` for statuses, `None` for optional fields) so a single
/// bad record never fails a whole listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyAssignment {
    pub id: DutyId,
    #[serde(default, deserialize_with = "lenient")]
    pub duty_name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub roster_type_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: DutyStatus,
    #[serde(default)]
    pub start_date: CalendarDate,
    #[serde(default)]
    pub end_date: CalendarDate,
    #[serde(default, deserialize_with = "lenient")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub time_slot_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub location_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub role_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub supervisor_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub instructions: Option<String>,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Option<i32>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub decline_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_dates")]
    pub dates: Vec<DutyDateRecord>,
}

/// Decodes `T`, or falls back to `T::default()` on `null` or a mistyped value.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Anything but an array reads as no dates; records that cannot be decoded
/// are skipped.
fn lenient_dates<'de, D>(deserializer: D) -> Result<Vec<DutyDateRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(records) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(records
        .into_iter()
        .filter_map(|record| serde_json::from_value(record).ok())
        .collect())
}

/// Accepts `1` as well as `"1"`.
fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => parse_timestamp(&raw),
        _ => None,
    })
}

/// Per-status counts over an assignment's dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateProgress {
    pub pending: usize,
    pub accepted: usize,
    pub declined: usize,
    pub completed: usize,
}

impl DateProgress {
    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.declined + self.completed
    }
}

impl DutyAssignment {
    /// Multi-day assignments carry more than one date record; a single
    /// record is treated as an ordinary single-day duty.
    pub fn is_multi_day(&self) -> bool {
        self.dates.len() > 1
    }

    pub fn validate(&self) -> RosterResult<()> {
        if let (Some(start), Some(end)) = (self.start_date.date(), self.end_date.date()) {
            if end < start {
                return Err(RosterError::Validation(format!(
                    "duty {} ends ({}) before it starts ({})",
                    self.id, end, start
                )));
            }
        }
        Ok(())
    }

    /// Whether `day` falls inside `[start_date, end_date]`. A missing or
    /// inverted end date collapses the range to the start date.
    pub fn covers(&self, day: NaiveDate) -> bool {
        let Some(start) = self.start_date.date() else {
            return false;
        };
        let end = self
            .end_date
            .date()
            .filter(|end| *end >= start)
            .unwrap_or(start);
        start <= day && day <= end
    }

    /// `(start_date, start_time)` as zero-padded strings.
    pub fn sort_key(&self) -> (String, String) {
        let time = self
            .start_time
            .as_deref()
            .map(normalize_time)
            .unwrap_or_else(|| DEFAULT_START_TIME.to_string());
        (self.start_date.key(), time)
    }

    pub fn time_label(&self) -> String {
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => format!("{} - {}", short_time(start), short_time(end)),
            (Some(start), None) => short_time(start).to_string(),
            _ => self
                .time_slot_name
                .clone()
                .unwrap_or_else(|| "All day".to_string()),
        }
    }

    pub fn priority_hint(&self) -> PriorityHint {
        PriorityHint::from_priority(self.priority)
    }

    pub fn date(&self, date_id: &DateId) -> Option<&DutyDateRecord> {
        self.dates.iter().find(|record| &record.id == date_id)
    }

    pub fn date_mut(&mut self, date_id: &DateId) -> Option<&mut DutyDateRecord> {
        self.dates.iter_mut().find(|record| &record.id == date_id)
    }

    pub fn has_pending_dates(&self) -> bool {
        self.dates
            .iter()
            .any(|record| record.status == DateStatus::PendingAcceptance)
    }

    pub fn date_progress(&self) -> DateProgress {
        let mut progress = DateProgress::default();
        for record in &self.dates {
            match record.status {
                DateStatus::PendingAcceptance => progress.pending += 1,
                DateStatus::Accepted => progress.accepted += 1,
                DateStatus::Declined => progress.declined += 1,
                DateStatus::Completed => progress.completed += 1,
                DateStatus::Unknown => {}
            }
        }
        progress
    }

    /// Parent status implied by the date records, or `None` when there are
    /// no dates to derive from.
    pub fn derived_status(&self) -> Option<DutyStatus> {
        let progress = self.date_progress();
        if progress.total() == 0 {
            return None;
        }
        let status = if progress.pending > 0 {
            DutyStatus::PendingAcceptance
        } else if progress.declined == progress.total() {
            DutyStatus::Declined
        } else if progress.completed + progress.declined == progress.total() {
            DutyStatus::Completed
        } else {
            DutyStatus::Scheduled
        };
        Some(status)
    }
}

/// Pads `H:MM` to `HH:MM` so times compare lexicographically.
fn normalize_time(raw: &str) -> String {
    let raw = raw.trim();
    match raw.split_once(':') {
        Some((hours, rest)) if hours.len() == 1 => format!("0{}:{}", hours, rest),
        _ => raw.to_string(),
    }
}

/// `HH:MM:SS` -> `HH:MM`
fn short_time(raw: &str) -> &str {
    raw.get(..5).unwrap_or(raw)
}

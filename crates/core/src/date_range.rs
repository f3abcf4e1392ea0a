//! # Date-Range Policy
//!
//! Converts a view mode into the inclusive window of dates to fetch. All
//! arithmetic happens on local calendar dates; callers pass in "today" as
//! their own clock sees it.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::RosterError;
use crate::models::calendar::format_date;

/// Half-width of the rolling window used by [`DateRangeMode::All`].
pub const ALL_WINDOW_MONTHS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRangeMode {
    Today,
    #[default]
    Week,
    Month,
    All,
}

impl DateRangeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRangeMode::Today => "today",
            DateRangeMode::Week => "week",
            DateRangeMode::Month => "month",
            DateRangeMode::All => "all",
        }
    }
}

impl fmt::Display for DateRangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRangeMode {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DateRangeMode::Today),
            "week" => Ok(DateRangeMode::Week),
            "month" => Ok(DateRangeMode::Month),
            "all" => Ok(DateRangeMode::All),
            other => Err(RosterError::Validation(format!("unknown view mode: {}", other))),
        }
    }
}

/// Inclusive `[start, end]` window of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn for_mode(mode: DateRangeMode, today: NaiveDate) -> Self {
        match mode {
            DateRangeMode::Today => Self {
                start: today,
                end: today,
            },
            DateRangeMode::Week => {
                let offset = u64::from(today.weekday().num_days_from_sunday());
                let start = today - Days::new(offset);
                Self {
                    start,
                    end: start + Days::new(6),
                }
            }
            DateRangeMode::Month => {
                let start = today.with_day(1).unwrap_or(today);
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(today);
                Self { start, end }
            }
            DateRangeMode::All => Self {
                start: today
                    .checked_sub_months(Months::new(ALL_WINDOW_MONTHS))
                    .unwrap_or(NaiveDate::MIN),
                end: today
                    .checked_add_months(Months::new(ALL_WINDOW_MONTHS))
                    .unwrap_or(NaiveDate::MAX),
            },
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn start_str(&self) -> String {
        format_date(self.start)
    }

    pub fn end_str(&self) -> String {
        format_date(self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start_str(), self.end_str())
    }
}

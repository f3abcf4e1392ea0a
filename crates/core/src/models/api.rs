use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::errors::{RosterError, RosterResult};
use crate::models::calendar::format_date;

/// Response envelope shared by every roster endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Turns `success: false` into a recoverable error.
    pub fn into_result(self) -> RosterResult<(Option<T>, Option<String>)> {
        if self.success {
            Ok((self.data, self.message))
        } else {
            Err(RosterError::Remote(
                self.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ))
        }
    }

    /// Like `into_result`, but a successful envelope must carry data.
    pub fn into_data(self) -> RosterResult<T> {
        match self.into_result()? {
            (Some(data), _) => Ok(data),
            (None, _) => Err(RosterError::Remote("response carried no data".to_string())),
        }
    }
}

/// Acknowledgement of a mutation, with the server's optional message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: Option<String>,
}

impl Ack {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeType {
    #[default]
    Teacher,
    Student,
    Staff,
}

impl AssigneeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssigneeType::Teacher => "teacher",
            AssigneeType::Student => "student",
            AssigneeType::Staff => "staff",
        }
    }
}

impl fmt::Display for AssigneeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssigneeType {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" => Ok(AssigneeType::Teacher),
            "student" => Ok(AssigneeType::Student),
            "staff" => Ok(AssigneeType::Staff),
            other => Err(RosterError::Validation(format!(
                "unknown assignee type: {}",
                other
            ))),
        }
    }
}

/// Whose duties to show. The id is absent until one is chosen, for
/// example a parent who has not picked a child yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignee {
    pub id: Option<String>,
    pub kind: AssigneeType,
}

impl Assignee {
    pub fn new(id: impl Into<String>, kind: AssigneeType) -> Self {
        Self {
            id: Some(id.into()),
            kind,
        }
    }

    pub fn unselected(kind: AssigneeType) -> Self {
        Self { id: None, kind }
    }

    /// Builds the listing query, or `None` if nobody is selected.
    pub fn query(&self, range: DateRange) -> Option<DutyQuery> {
        let id = self.id.as_ref().filter(|id| !id.trim().is_empty())?;
        Some(DutyQuery {
            assignee_id: id.clone(),
            assignee_type: self.kind,
            start_date: format_date(range.start),
            end_date: format_date(range.end),
        })
    }
}

/// Query string of the duty listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyQuery {
    pub assignee_id: String,
    pub assignee_type: AssigneeType,
    pub start_date: String,
    pub end_date: String,
}

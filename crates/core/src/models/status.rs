use std::fmt;

use serde::{Deserialize, Serialize};

/// Display metadata for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStyle {
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    Scheduled,
    Active,
    Completed,
    PendingApproval,
    PendingAcceptance,
    Declined,
    Cancelled,
    Accepted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl DutyStatus {
    pub const ALL: [DutyStatus; 8] = [
        DutyStatus::Scheduled,
        DutyStatus::Active,
        DutyStatus::Completed,
        DutyStatus::PendingApproval,
        DutyStatus::PendingAcceptance,
        DutyStatus::Declined,
        DutyStatus::Cancelled,
        DutyStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DutyStatus::Scheduled => "scheduled",
            DutyStatus::Active => "active",
            DutyStatus::Completed => "completed",
            DutyStatus::PendingApproval => "pending_approval",
            DutyStatus::PendingAcceptance => "pending_acceptance",
            DutyStatus::Declined => "declined",
            DutyStatus::Cancelled => "cancelled",
            DutyStatus::Accepted => "accepted",
            DutyStatus::Unknown => "unknown",
        }
    }

    /// Strict parse; unknown codes are rejected rather than defaulted.
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == code)
    }

    /// `accepted` behaves like `scheduled` wherever eligibility is decided.
    pub fn effective(self) -> Self {
        match self {
            DutyStatus::Accepted => DutyStatus::Scheduled,
            other => other,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DutyStatus::PendingApproval | DutyStatus::PendingAcceptance)
    }

    pub fn can_accept(&self) -> bool {
        *self == DutyStatus::PendingAcceptance
    }

    pub fn can_decline(&self) -> bool {
        *self == DutyStatus::PendingAcceptance
    }

    pub fn can_complete(&self) -> bool {
        matches!(self.effective(), DutyStatus::Scheduled | DutyStatus::Active)
    }

    pub fn style(&self) -> StatusStyle {
        match self {
            DutyStatus::Scheduled | DutyStatus::Accepted => StatusStyle {
                label: "Scheduled",
                color: "blue",
                icon: "calendar",
            },
            DutyStatus::Active => StatusStyle {
                label: "Active",
                color: "green",
                icon: "play",
            },
            DutyStatus::Completed => StatusStyle {
                label: "Completed",
                color: "gray",
                icon: "check-circle",
            },
            DutyStatus::PendingApproval => StatusStyle {
                label: "Pending Approval",
                color: "yellow",
                icon: "hourglass",
            },
            DutyStatus::PendingAcceptance => StatusStyle {
                label: "Awaiting Response",
                color: "orange",
                icon: "bell",
            },
            DutyStatus::Declined => StatusStyle {
                label: "Declined",
                color: "red",
                icon: "x-circle",
            },
            DutyStatus::Cancelled => StatusStyle {
                label: "Cancelled",
                color: "red",
                icon: "slash",
            },
            DutyStatus::Unknown => StatusStyle {
                label: "Unknown",
                color: "gray",
                icon: "help-circle",
            },
        }
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one calendar date inside a multi-day assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStatus {
    PendingAcceptance,
    Accepted,
    Declined,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl DateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateStatus::PendingAcceptance => "pending_acceptance",
            DateStatus::Accepted => "accepted",
            DateStatus::Declined => "declined",
            DateStatus::Completed => "completed",
            DateStatus::Unknown => "unknown",
        }
    }

    pub fn style(&self) -> StatusStyle {
        match self {
            DateStatus::PendingAcceptance => StatusStyle {
                label: "Pending",
                color: "orange",
                icon: "bell",
            },
            DateStatus::Accepted => StatusStyle {
                label: "Accepted",
                color: "blue",
                icon: "thumbs-up",
            },
            DateStatus::Declined => StatusStyle {
                label: "Declined",
                color: "red",
                icon: "x-circle",
            },
            DateStatus::Completed => StatusStyle {
                label: "Completed",
                color: "gray",
                icon: "check-circle",
            },
            DateStatus::Unknown => StatusStyle {
                label: "Unknown",
                color: "gray",
                icon: "help-circle",
            },
        }
    }
}

impl fmt::Display for DateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour hint derived from an assignment's priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityHint {
    High,
    Medium,
    Normal,
}

impl PriorityHint {
    /// Priority 1 is the most urgent.
    pub fn from_priority(priority: Option<i32>) -> Self {
        match priority {
            Some(1) => PriorityHint::High,
            Some(2) => PriorityHint::Medium,
            _ => PriorityHint::Normal,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PriorityHint::High => "red",
            PriorityHint::Medium => "amber",
            PriorityHint::Normal => "slate",
        }
    }
}

use dutyroster_core::models::api::{Assignee, AssigneeType};

use crate::config::ClientConfig;

/// The signed-in caller, passed explicitly to everything that needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub user_type: AssigneeType,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>, user_type: AssigneeType) -> Self {
        Self {
            token: Some(token.into()),
            user_id: Some(user_id.into()),
            user_type,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            token: config.api_token.clone(),
            user_id: config.user_id.clone(),
            user_type: config.assignee_type,
        }
    }

    /// The caller's own duties. Parents and admins pick someone else through
    /// [`Session::assignee_for`].
    pub fn own_assignee(&self) -> Assignee {
        Assignee {
            id: self.user_id.clone(),
            kind: self.user_type,
        }
    }

    /// An explicit selection wins over the caller's own id.
    pub fn assignee_for(&self, selected: Option<&str>, kind: AssigneeType) -> Assignee {
        match selected {
            Some(id) => Assignee::new(id, kind),
            None if kind == self.user_type => self.own_assignee(),
            None => Assignee::unselected(kind),
        }
    }
}

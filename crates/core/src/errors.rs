use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Action already in progress for {0}")]
    Busy(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(#[from] eyre::Report),
}

impl RosterError {
    /// True for failures the user can fix by trying again, as opposed to
    /// failed preconditions that never reached the network.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RosterError::Remote(_) | RosterError::Timeout(_) | RosterError::Transport(_)
        )
    }
}

pub type RosterResult<T> = Result<T, RosterError>;

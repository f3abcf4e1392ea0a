use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use dutyroster_core::models::duty::{DateId, DutyId};

/// The entity an action targets. Duty-level and date-level keys never
/// compare equal, even when their display forms coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    Duty(DutyId),
    DutyDate(DutyId, DateId),
}

impl ActionKey {
    pub fn duty(duty_id: &DutyId) -> Self {
        ActionKey::Duty(duty_id.clone())
    }

    pub fn date(duty_id: &DutyId, date_id: &DateId) -> Self {
        ActionKey::DutyDate(duty_id.clone(), date_id.clone())
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::Duty(duty_id) => write!(f, "{}", duty_id),
            ActionKey::DutyDate(duty_id, date_id) => write!(f, "{}-{}", duty_id, date_id),
        }
    }
}

/// Keys with a mutation currently in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlightActions {
    keys: Arc<Mutex<HashSet<ActionKey>>>,
}

impl InFlightActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`, or returns `None` if it is already claimed.
    pub fn try_acquire(&self, key: ActionKey) -> Option<ActionToken> {
        if !self.lock().insert(key.clone()) {
            return None;
        }
        Some(ActionToken {
            key,
            keys: self.keys.clone(),
        })
    }

    pub fn is_busy(&self, key: &ActionKey) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ActionKey>> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases its key when dropped, whatever the outcome of the action.
#[derive(Debug)]
pub struct ActionToken {
    key: ActionKey,
    keys: Arc<Mutex<HashSet<ActionKey>>>,
}

impl ActionToken {
    pub fn key(&self) -> &ActionKey {
        &self.key
    }
}

impl Drop for ActionToken {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use dutyroster_core::{
    errors::{RosterError, RosterResult},
    models::{
        api::{Ack, DutyQuery},
        calendar::parse_date_portion,
        duty::{DateId, DutyAssignment, DutyDateRecord, DutyId},
        status::{DateStatus, DutyStatus},
    },
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::api::RosterApi;

/// Stateful stand-in for the roster server.
///
/// Applies the same transitions the real server does, records every call
/// as `"<operation>:<ids>"`, can fail the next call on demand, and can hold
/// mutations open so tests can observe in-flight behaviour.
#[derive(Clone, Default)]
pub struct InMemoryRoster {
    duties: Arc<Mutex<Vec<DutyAssignment>>>,
    calls: Arc<Mutex<Vec<String>>>,
    next_failure: Arc<Mutex<Option<String>>>,
    gate: Arc<RwLock<()>>,
}

impl InMemoryRoster {
    pub fn new(duties: Vec<DutyAssignment>) -> Self {
        Self {
            duties: Arc::new(Mutex::new(duties)),
            ..Self::default()
        }
    }

    pub fn duty(&self, duty_id: &str) -> Option<DutyAssignment> {
        self.lock_duties()
            .iter()
            .find(|duty| duty.id.as_str() == duty_id)
            .cloned()
    }

    pub fn replace_duties(&self, duties: Vec<DutyAssignment>) {
        *self.lock_duties() = duties;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of recorded calls to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        let prefix = format!("{}:", operation);
        self.calls()
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    /// Makes the next call answer `success: false` with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.next_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    /// Blocks every mutation until the returned guard is dropped.
    pub async fn hold_mutations(&self) -> OwnedRwLockWriteGuard<()> {
        self.gate.clone().write_owned().await
    }

    fn lock_duties(&self) -> std::sync::MutexGuard<'_, Vec<DutyAssignment>> {
        self.duties.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) -> RosterResult<()> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
        match self.next_failure.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(message) => Err(RosterError::Remote(message)),
            None => Ok(()),
        }
    }

    async fn mutate<F>(&self, call: String, duty_id: &DutyId, apply: F) -> RosterResult<Ack>
    where
        F: FnOnce(&mut DutyAssignment) -> Result<&'static str, String>,
    {
        let _open = self.gate.read().await;
        self.record(call)?;

        let mut duties = self.lock_duties();
        let duty = duties
            .iter_mut()
            .find(|duty| &duty.id == duty_id)
            .ok_or_else(|| RosterError::Remote(format!("Duty {} not found", duty_id)))?;
        let message = apply(duty).map_err(RosterError::Remote)?;
        Ok(Ack::with_message(message))
    }

    async fn mutate_date<F>(
        &self,
        call: String,
        duty_id: &DutyId,
        date_id: &DateId,
        apply: F,
    ) -> RosterResult<Ack>
    where
        F: FnOnce(&mut DutyDateRecord) -> Result<&'static str, String>,
    {
        let date_id = date_id.clone();
        self.mutate(call, duty_id, move |duty| {
            let record = duty
                .date_mut(&date_id)
                .ok_or_else(|| format!("Date {} not found", date_id))?;
            let message = apply(record)?;
            if let Some(status) = duty.derived_status() {
                duty.status = status;
            }
            Ok(message)
        })
        .await
    }
}

fn overlaps(duty: &DutyAssignment, query: &DutyQuery) -> bool {
    let (Some(from), Some(to)) = (
        parse_date_portion(&query.start_date),
        parse_date_portion(&query.end_date),
    ) else {
        return false;
    };
    let Some(start) = duty.start_date.date() else {
        return false;
    };
    let end = duty.end_date.date().unwrap_or(start).max(start);
    start <= to && end >= from
}

#[async_trait]
impl RosterApi for InMemoryRoster {
    async fn list_duties(&self, query: &DutyQuery) -> RosterResult<Vec<DutyAssignment>> {
        self.record(format!("list_duties:{}", query.assignee_id))?;
        Ok(self
            .lock_duties()
            .iter()
            .filter(|duty| overlaps(duty, query))
            .cloned()
            .collect())
    }

    async fn accept_assignment(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        self.mutate(format!("accept_assignment:{}", duty_id), duty_id, |duty| {
            if duty.status != DutyStatus::PendingAcceptance {
                return Err("Duty is not awaiting acceptance".to_string());
            }
            duty.status = DutyStatus::Scheduled;
            Ok("Duty accepted")
        })
        .await
    }

    async fn decline_assignment(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack> {
        let reason = reason.to_string();
        self.mutate(format!("decline_assignment:{}", duty_id), duty_id, move |duty| {
            if duty.status != DutyStatus::PendingAcceptance {
                return Err("Duty is not awaiting acceptance".to_string());
            }
            duty.status = DutyStatus::Declined;
            duty.decline_reason = Some(reason);
            Ok("Duty declined")
        })
        .await
    }

    async fn accept_all_dates(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        self.mutate(format!("accept_all_dates:{}", duty_id), duty_id, |duty| {
            for record in duty.dates.iter_mut() {
                if record.status == DateStatus::PendingAcceptance {
                    record.status = DateStatus::Accepted;
                }
            }
            duty.status = DutyStatus::Scheduled;
            Ok("All dates accepted")
        })
        .await
    }

    async fn decline_all_dates(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack> {
        let reason = reason.to_string();
        self.mutate(format!("decline_all_dates:{}", duty_id), duty_id, move |duty| {
            for record in duty.dates.iter_mut() {
                record.status = DateStatus::Declined;
                record.decline_reason = Some(reason.clone());
            }
            duty.status = DutyStatus::Declined;
            duty.decline_reason = Some(reason);
            Ok("All dates declined")
        })
        .await
    }

    async fn accept_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack> {
        let call = format!("accept_date:{}-{}", duty_id, date_id);
        self.mutate_date(call, duty_id, date_id, |record| {
            if record.status != DateStatus::PendingAcceptance {
                return Err("Date is not awaiting acceptance".to_string());
            }
            record.status = DateStatus::Accepted;
            Ok("Date accepted")
        })
        .await
    }

    async fn decline_date(
        &self,
        duty_id: &DutyId,
        date_id: &DateId,
        reason: &str,
    ) -> RosterResult<Ack> {
        let call = format!("decline_date:{}-{}", duty_id, date_id);
        let reason = reason.to_string();
        self.mutate_date(call, duty_id, date_id, move |record| {
            if record.status != DateStatus::PendingAcceptance {
                return Err("Date is not awaiting acceptance".to_string());
            }
            record.status = DateStatus::Declined;
            record.decline_reason = Some(reason);
            Ok("Date declined")
        })
        .await
    }

    async fn complete_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack> {
        let call = format!("complete_date:{}-{}", duty_id, date_id);
        self.mutate_date(call, duty_id, date_id, |record| {
            if record.status != DateStatus::Accepted {
                return Err("Date has not been accepted".to_string());
            }
            record.status = DateStatus::Completed;
            Ok("Date completed")
        })
        .await
    }

    async fn mark_complete(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        self.mutate(format!("mark_complete:{}", duty_id), duty_id, |duty| {
            if !duty.status.can_complete() {
                return Err("Duty cannot be completed".to_string());
            }
            duty.status = DutyStatus::Completed;
            duty.completed_at = Some(Utc::now());
            Ok("Duty marked as complete")
        })
        .await
    }

    async fn list_assignment_dates(&self, duty_id: &DutyId) -> RosterResult<Vec<DutyDateRecord>> {
        self.record(format!("list_assignment_dates:{}", duty_id))?;
        self.lock_duties()
            .iter()
            .find(|duty| &duty.id == duty_id)
            .map(|duty| duty.dates.clone())
            .ok_or_else(|| RosterError::Remote(format!("Duty {} not found", duty_id)))
    }
}

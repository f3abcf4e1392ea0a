use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dutyroster_client::RosterApi;
use dutyroster_core::{
    errors::{RosterError, RosterResult},
    models::{
        api::Ack,
        duty::{DateId, DutyAssignment, DutyDateRecord, DutyId},
        status::{DateStatus, DutyStatus},
    },
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::aggregator::{DEFAULT_TIMEOUT, DutyAggregator};
use crate::in_flight::{ActionKey, ActionToken, InFlightActions};
use crate::notice::Notice;

const NOTICE_CAPACITY: usize = 32;

/// Controls offered for a whole assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyAction {
    Accept,
    Decline,
    MarkComplete,
    AcceptAll,
    DeclineAll,
}

/// Controls offered for one date of a multi-day assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAction {
    Accept,
    Decline,
    Complete,
}

pub fn available_actions(duty: &DutyAssignment) -> Vec<DutyAction> {
    if duty.is_multi_day() {
        if duty.has_pending_dates() {
            return vec![DutyAction::AcceptAll, DutyAction::DeclineAll];
        }
        return Vec::new();
    }

    let mut actions = Vec::new();
    if duty.status.can_accept() {
        actions.push(DutyAction::Accept);
    }
    if duty.status.can_decline() {
        actions.push(DutyAction::Decline);
    }
    if duty.status.can_complete() {
        actions.push(DutyAction::MarkComplete);
    }
    actions
}

pub fn date_actions(record: &DutyDateRecord) -> Vec<DateAction> {
    match record.status {
        DateStatus::PendingAcceptance => vec![DateAction::Accept, DateAction::Decline],
        DateStatus::Accepted => vec![DateAction::Complete],
        _ => Vec::new(),
    }
}

/// Rejects blank decline reasons before anything goes over the wire.
pub fn validate_reason(reason: &str) -> RosterResult<&str> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(RosterError::Validation(
            "Please provide a reason for declining".to_string(),
        ));
    }
    Ok(reason)
}

fn invalid(action: &'static str, state: impl ToString) -> RosterError {
    RosterError::InvalidTransition {
        action,
        state: state.to_string(),
    }
}

/// Drives duty and date transitions against the roster API.
///
/// At most one mutation per [`ActionKey`] is in flight; other entities stay
/// usable meanwhile. Anything that can change a duty's own status re-runs
/// the aggregator's fetch afterwards. Date changes that leave the derived
/// parent status alone are only patched locally.
pub struct DutyLifecycle {
    api: Arc<dyn RosterApi>,
    aggregator: Arc<DutyAggregator>,
    in_flight: InFlightActions,
    notices: broadcast::Sender<Notice>,
    timeout: Duration,
}

impl DutyLifecycle {
    pub fn new(api: Arc<dyn RosterApi>, aggregator: Arc<DutyAggregator>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            api,
            aggregator,
            in_flight: InFlightActions::new(),
            notices,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn aggregator(&self) -> &Arc<DutyAggregator> {
        &self.aggregator
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Whether controls for `key` should show a spinner.
    pub fn is_busy(&self, key: &ActionKey) -> bool {
        self.in_flight.is_busy(key)
    }

    pub async fn accept(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        let duty = self.require_duty(duty_id).await?;
        if !duty.status.can_accept() {
            return Err(invalid("accept", duty.status));
        }

        let key = ActionKey::duty(duty_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call("accept duty", &key, self.api.accept_assignment(duty_id))
            .await?;

        self.aggregator
            .update(duty_id, |duty| duty.status = DutyStatus::Scheduled)
            .await;
        info!("Accepted duty {}", duty_id);
        self.refresh().await;
        self.announce(&ack, "Duty accepted");
        Ok(ack)
    }

    pub async fn decline(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack> {
        let reason = validate_reason(reason)?;
        let duty = self.require_duty(duty_id).await?;
        if !duty.status.can_decline() {
            return Err(invalid("decline", duty.status));
        }

        let key = ActionKey::duty(duty_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call("decline duty", &key, self.api.decline_assignment(duty_id, reason))
            .await?;

        self.aggregator
            .update(duty_id, |duty| {
                duty.status = DutyStatus::Declined;
                duty.decline_reason = Some(reason.to_string());
            })
            .await;
        info!("Declined duty {}", duty_id);
        self.refresh().await;
        self.announce(&ack, "Duty declined");
        Ok(ack)
    }

    pub async fn mark_complete(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        let duty = self.require_duty(duty_id).await?;
        if !duty.status.can_complete() {
            return Err(invalid("complete", duty.status));
        }

        let key = ActionKey::duty(duty_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call("complete duty", &key, self.api.mark_complete(duty_id))
            .await?;

        self.aggregator
            .update(duty_id, |duty| {
                duty.status = DutyStatus::Completed;
                duty.completed_at = Some(Utc::now());
            })
            .await;
        info!("Completed duty {}", duty_id);
        self.refresh().await;
        self.announce(&ack, "Duty marked as complete");
        Ok(ack)
    }

    /// Accepts every pending date of a multi-day duty.
    pub async fn accept_all(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        let duty = self.require_duty(duty_id).await?;
        Self::require_bulk(&duty, "accept all dates of")?;

        let key = ActionKey::duty(duty_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call("accept all dates", &key, self.api.accept_all_dates(duty_id))
            .await?;

        self.reload_dates(duty_id, DutyStatus::Scheduled, None).await;
        info!("Accepted all dates of duty {}", duty_id);
        self.refresh().await;
        self.announce(&ack, "All dates accepted");
        Ok(ack)
    }

    /// Declines every date of a multi-day duty with one reason.
    pub async fn decline_all_dates(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack> {
        let reason = validate_reason(reason)?;
        let duty = self.require_duty(duty_id).await?;
        Self::require_bulk(&duty, "decline all dates of")?;

        let key = ActionKey::duty(duty_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call(
                "decline all dates",
                &key,
                self.api.decline_all_dates(duty_id, reason),
            )
            .await?;

        self.reload_dates(duty_id, DutyStatus::Declined, Some(reason))
            .await;
        info!("Declined all dates of duty {}", duty_id);
        self.refresh().await;
        self.announce(&ack, "All dates declined");
        Ok(ack)
    }

    /// Accepts one date. Always re-fetches, since the parent's status is
    /// derived from its dates.
    pub async fn accept_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack> {
        let record = self.require_date(duty_id, date_id).await?;
        if record.status != DateStatus::PendingAcceptance {
            return Err(invalid("accept date", record.status));
        }

        let key = ActionKey::date(duty_id, date_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call("accept date", &key, self.api.accept_date(duty_id, date_id))
            .await?;

        self.patch_date(duty_id, date_id, |record| {
            record.status = DateStatus::Accepted;
        })
        .await;
        info!("Accepted date {} of duty {}", date_id, duty_id);
        self.refresh().await;
        self.announce(&ack, "Date accepted");
        Ok(ack)
    }

    pub async fn decline_date(
        &self,
        duty_id: &DutyId,
        date_id: &DateId,
        reason: &str,
    ) -> RosterResult<Ack> {
        let reason = validate_reason(reason)?;
        let record = self.require_date(duty_id, date_id).await?;
        if record.status != DateStatus::PendingAcceptance {
            return Err(invalid("decline date", record.status));
        }

        let key = ActionKey::date(duty_id, date_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call(
                "decline date",
                &key,
                self.api.decline_date(duty_id, date_id, reason),
            )
            .await?;

        let flipped = self
            .patch_date(duty_id, date_id, |record| {
                record.status = DateStatus::Declined;
                record.decline_reason = Some(reason.to_string());
            })
            .await;
        info!("Declined date {} of duty {}", date_id, duty_id);
        if flipped {
            self.refresh().await;
        }
        self.announce(&ack, "Date declined");
        Ok(ack)
    }

    pub async fn complete_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack> {
        let record = self.require_date(duty_id, date_id).await?;
        if record.status != DateStatus::Accepted {
            return Err(invalid("complete date", record.status));
        }

        let key = ActionKey::date(duty_id, date_id);
        let _token = self.acquire(&key)?;
        let ack = self
            .call("complete date", &key, self.api.complete_date(duty_id, date_id))
            .await?;

        let flipped = self
            .patch_date(duty_id, date_id, |record| {
                record.status = DateStatus::Completed;
            })
            .await;
        info!("Completed date {} of duty {}", date_id, duty_id);
        if flipped {
            self.refresh().await;
        }
        self.announce(&ack, "Date marked as complete");
        Ok(ack)
    }

    async fn require_duty(&self, duty_id: &DutyId) -> RosterResult<DutyAssignment> {
        self.aggregator
            .find(duty_id)
            .await
            .ok_or_else(|| RosterError::NotFound(format!("duty {}", duty_id)))
    }

    async fn require_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<DutyDateRecord> {
        let duty = self.require_duty(duty_id).await?;
        duty.date(date_id)
            .cloned()
            .ok_or_else(|| RosterError::NotFound(format!("date {} of duty {}", date_id, duty_id)))
    }

    fn require_bulk(duty: &DutyAssignment, action: &'static str) -> RosterResult<()> {
        if !duty.is_multi_day() {
            return Err(invalid(action, "single-day duty"));
        }
        if !duty.has_pending_dates() {
            return Err(invalid(action, "no pending dates"));
        }
        Ok(())
    }

    fn acquire(&self, key: &ActionKey) -> RosterResult<ActionToken> {
        self.in_flight.try_acquire(key.clone()).ok_or_else(|| {
            debug!("Ignoring action on {}: one is already in flight", key);
            RosterError::Busy(key.to_string())
        })
    }

    /// Runs one remote call under the timeout; failures are logged and
    /// announced but otherwise leave state untouched.
    async fn call<F>(&self, action: &str, key: &ActionKey, request: F) -> RosterResult<Ack>
    where
        F: Future<Output = RosterResult<Ack>>,
    {
        let result = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(RosterError::Timeout(self.timeout.as_secs())),
        };
        if let Err(e) = &result {
            error!("Failed to {} {}: {}", action, key, e);
            self.publish(Notice::error(format!("Failed to {}: {}", action, e)));
        }
        result
    }

    /// Applies a date patch and reports whether the parent's derived status
    /// no longer matches the status it carries.
    async fn patch_date(
        &self,
        duty_id: &DutyId,
        date_id: &DateId,
        patch: impl FnOnce(&mut DutyDateRecord),
    ) -> bool {
        self.aggregator
            .update(duty_id, |duty| {
                if let Some(record) = duty.date_mut(date_id) {
                    patch(record);
                }
                duty.derived_status()
                    .is_some_and(|derived| derived != duty.status.effective())
            })
            .await
            .unwrap_or(true)
    }

    /// Replaces a duty's dates with the server's copy after a bulk change.
    /// The parent status only moves together with reloaded dates; if they
    /// cannot be fetched the duty is left for the refresh to correct.
    async fn reload_dates(&self, duty_id: &DutyId, parent: DutyStatus, reason: Option<&str>) {
        let dates =
            match tokio::time::timeout(self.timeout, self.api.list_assignment_dates(duty_id)).await {
                Ok(Ok(dates)) => Some(dates),
                Ok(Err(e)) => {
                    warn!("Failed to reload dates of duty {}: {}", duty_id, e);
                    None
                }
                Err(_) => {
                    warn!("Reloading dates of duty {} timed out", duty_id);
                    None
                }
            };

        let Some(dates) = dates else {
            return;
        };
        self.aggregator
            .update(duty_id, |duty| {
                duty.dates = dates;
                duty.status = parent;
                if let Some(reason) = reason {
                    duty.decline_reason = Some(reason.to_string());
                }
            })
            .await;
    }

    async fn refresh(&self) {
        if self.aggregator.is_closed() {
            return;
        }
        if let Err(e) = self.aggregator.fetch().await {
            warn!("Failed to refresh duties after update: {}", e);
            self.publish(Notice::warning("Saved, but the duty list could not be refreshed"));
        }
    }

    fn announce(&self, ack: &Ack, fallback: &str) {
        let message = ack.message.clone().unwrap_or_else(|| fallback.to_string());
        self.publish(Notice::success(message));
    }

    fn publish(&self, notice: Notice) {
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }
}

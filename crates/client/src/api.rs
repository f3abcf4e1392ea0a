use async_trait::async_trait;
use mockall::automock;
use dutyroster_core::{
    errors::RosterResult,
    models::{
        api::{Ack, DutyQuery},
        duty::{DateId, DutyAssignment, DutyDateRecord, DutyId},
    },
};

/// Remote operations the duty views depend on.
///
/// Every call is a suspension point. A `success: false` response comes back
/// as [`RosterError::Remote`](dutyroster_core::errors::RosterError::Remote),
/// never as a panic.
#[automock]
#[async_trait]
pub trait RosterApi: Send + Sync {
    /// Duties of one assignee inside an inclusive date window.
    async fn list_duties(&self, query: &DutyQuery) -> RosterResult<Vec<DutyAssignment>>;

    async fn accept_assignment(&self, duty_id: &DutyId) -> RosterResult<Ack>;

    async fn decline_assignment(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack>;

    /// Accepts every pending date of a multi-day assignment.
    async fn accept_all_dates(&self, duty_id: &DutyId) -> RosterResult<Ack>;

    /// Declines every date of a multi-day assignment with one reason.
    async fn decline_all_dates(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack>;

    async fn accept_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack>;

    async fn decline_date(
        &self,
        duty_id: &DutyId,
        date_id: &DateId,
        reason: &str,
    ) -> RosterResult<Ack>;

    async fn complete_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack>;

    async fn mark_complete(&self, duty_id: &DutyId) -> RosterResult<Ack>;

    async fn list_assignment_dates(&self, duty_id: &DutyId) -> RosterResult<Vec<DutyDateRecord>>;
}

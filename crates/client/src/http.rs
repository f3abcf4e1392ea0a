use async_trait::async_trait;
use eyre::eyre;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use dutyroster_core::{
    errors::{RosterError, RosterResult},
    models::{
        api::{Ack, ApiEnvelope, DutyQuery, ReasonRequest},
        duty::{DateId, DutyAssignment, DutyDateRecord, DutyId},
    },
};
use tracing::{debug, warn};

use crate::{api::RosterApi, config::ClientConfig, session::Session};

/// Roster API over HTTP.
///
/// Requests carry the session's bearer token and are bounded by the
/// configured timeout, so a hung server surfaces as
/// [`RosterError::Timeout`] instead of waiting forever.
#[derive(Debug, Clone)]
pub struct HttpRosterApi {
    client: Client,
    base_url: String,
    session: Session,
    timeout_secs: u64,
}

impl HttpRosterApi {
    pub fn new(config: &ClientConfig, session: Session) -> RosterResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            session,
            timeout_secs: config.request_timeout,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/roster/{}", self.base_url, path)
    }

    fn assignment_url(&self, duty_id: &DutyId, suffix: &str) -> String {
        self.url(&format!(
            "assignments/{}/{}",
            urlencoding::encode(duty_id.as_str()),
            suffix
        ))
    }

    fn date_url(&self, duty_id: &DutyId, date_id: &DateId, action: &str) -> String {
        self.assignment_url(
            duty_id,
            &format!("dates/{}/{}", urlencoding::encode(date_id.as_str()), action),
        )
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RosterResult<ApiEnvelope<T>> {
        let request = match &self.session.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            // Error pages that are not envelopes still count as remote failures
            Err(_) if !status.is_success() => {
                warn!("Roster API returned {}: {}", status, body);
                Err(RosterError::Remote(format!("HTTP {}", status)))
            }
            Err(e) => Err(RosterError::Transport(eyre!("Malformed roster API response: {}", e))),
        }
    }

    async fn post_ack(&self, url: String, reason: Option<&str>) -> RosterResult<Ack> {
        debug!("POST {}", url);
        let request = self.client.post(&url);
        let request = match reason {
            Some(reason) => request.json(&ReasonRequest {
                reason: reason.to_string(),
            }),
            None => request,
        };

        let (_, message) = self
            .send::<serde_json::Value>(request)
            .await?
            .into_result()?;
        Ok(Ack { message })
    }

    fn transport_error(&self, err: reqwest::Error) -> RosterError {
        if err.is_timeout() {
            RosterError::Timeout(self.timeout_secs)
        } else {
            RosterError::Transport(eyre!("Roster API request failed: {}", err))
        }
    }
}

#[async_trait]
impl RosterApi for HttpRosterApi {
    async fn list_duties(&self, query: &DutyQuery) -> RosterResult<Vec<DutyAssignment>> {
        let url = self.url("my-duties");
        debug!(
            "GET {} assignee={} type={} window={}..={}",
            url, query.assignee_id, query.assignee_type, query.start_date, query.end_date
        );

        self.send(self.client.get(&url).query(query)).await?.into_data()
    }

    async fn accept_assignment(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        self.post_ack(self.assignment_url(duty_id, "accept"), None).await
    }

    async fn decline_assignment(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack> {
        self.post_ack(self.assignment_url(duty_id, "decline"), Some(reason))
            .await
    }

    async fn accept_all_dates(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        self.post_ack(self.assignment_url(duty_id, "dates/accept-all"), None)
            .await
    }

    async fn decline_all_dates(&self, duty_id: &DutyId, reason: &str) -> RosterResult<Ack> {
        self.post_ack(self.assignment_url(duty_id, "dates/decline-all"), Some(reason))
            .await
    }

    async fn accept_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack> {
        self.post_ack(self.date_url(duty_id, date_id, "accept"), None)
            .await
    }

    async fn decline_date(
        &self,
        duty_id: &DutyId,
        date_id: &DateId,
        reason: &str,
    ) -> RosterResult<Ack> {
        self.post_ack(self.date_url(duty_id, date_id, "decline"), Some(reason))
            .await
    }

    async fn complete_date(&self, duty_id: &DutyId, date_id: &DateId) -> RosterResult<Ack> {
        self.post_ack(self.date_url(duty_id, date_id, "complete"), None)
            .await
    }

    async fn mark_complete(&self, duty_id: &DutyId) -> RosterResult<Ack> {
        self.post_ack(self.assignment_url(duty_id, "complete"), None)
            .await
    }

    async fn list_assignment_dates(&self, duty_id: &DutyId) -> RosterResult<Vec<DutyDateRecord>> {
        let url = self.assignment_url(duty_id, "dates");
        debug!("GET {}", url);

        self.send(self.client.get(&url)).await?.into_data()
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use dutyroster_client::{RosterApi, mock::InMemoryRoster};
use dutyroster_core::{
    date_range::DateRangeMode,
    models::{
        api::{Assignee, AssigneeType},
        duty::DutyAssignment,
    },
};
use dutyroster_duties::{DutyAggregator, DutyLifecycle, FixedClock};
use serde_json::json;

/// Thursday
pub const TODAY: &str = "2025-06-12";

pub fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
}

pub fn duty(id: &str, start_date: &str, status: &str) -> DutyAssignment {
    serde_json::from_value(json!({
        "id": id,
        "duty_name": format!("Duty {}", id),
        "status": status,
        "start_date": start_date,
        "end_date": start_date,
    }))
    .expect("valid duty fixture")
}

pub fn timed_duty(id: &str, start_date: &str, start_time: &str, status: &str) -> DutyAssignment {
    let mut duty = duty(id, start_date, status);
    duty.start_time = Some(start_time.to_string());
    duty
}

/// Multi-day duty with one date record per `(date_id, date, status)`.
pub fn multi_day(id: &str, status: &str, dates: &[(&str, &str, &str)]) -> DutyAssignment {
    let records: Vec<_> = dates
        .iter()
        .map(|(date_id, date, status)| json!({"id": date_id, "date": date, "status": status}))
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "duty_name": format!("Duty {}", id),
        "status": status,
        "start_date": dates.first().map(|d| d.1),
        "end_date": dates.last().map(|d| d.1),
        "dates": records,
    }))
    .expect("valid multi-day fixture")
}

pub fn teacher() -> Assignee {
    Assignee::new("t-17", AssigneeType::Teacher)
}

pub fn aggregator(api: Arc<dyn RosterApi>, mode: DateRangeMode) -> Arc<DutyAggregator> {
    Arc::new(
        DutyAggregator::new(api, teacher(), mode).with_clock(Arc::new(FixedClock(day(TODAY)))),
    )
}

pub struct Harness {
    pub server: InMemoryRoster,
    pub aggregator: Arc<DutyAggregator>,
    pub lifecycle: Arc<DutyLifecycle>,
}

/// In-memory server holding `duties`, with the aggregator already loaded.
pub async fn harness(duties: Vec<DutyAssignment>) -> Harness {
    let server = InMemoryRoster::new(duties);
    let api: Arc<dyn RosterApi> = Arc::new(server.clone());
    let aggregator = aggregator(api.clone(), DateRangeMode::All);
    aggregator.fetch().await.expect("initial fetch");
    let lifecycle = Arc::new(DutyLifecycle::new(api, aggregator.clone()));

    Harness {
        server,
        aggregator,
        lifecycle,
    }
}

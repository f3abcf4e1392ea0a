mod common;

use std::sync::Arc;
use std::time::Duration;

use mockall::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use dutyroster_client::{RosterApi, mock::MockRosterApi};
use dutyroster_core::{
    date_range::DateRangeMode,
    errors::RosterError,
    models::{
        duty::{DateId, DutyId},
        status::{DateStatus, DutyStatus},
    },
};
use dutyroster_duties::{
    ActionKey, DutyLifecycle, NoticeLevel,
    lifecycle::{DateAction, DutyAction, available_actions, date_actions, validate_reason},
};

use common::{TODAY, aggregator, duty, harness, multi_day};

fn id(raw: &str) -> DutyId {
    DutyId::new(raw)
}

fn date(raw: &str) -> DateId {
    DateId::new(raw)
}

async fn wait_until_busy(lifecycle: &DutyLifecycle, key: &ActionKey) {
    for _ in 0..200 {
        if lifecycle.is_busy(key) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{} never became busy", key);
}

#[tokio::test]
async fn test_accept_moves_pending_duty_to_scheduled() {
    let h = harness(vec![duty("d1", TODAY, "pending_acceptance")]).await;
    let mut notices = h.lifecycle.subscribe();

    let ack = h.lifecycle.accept(&id("d1")).await.unwrap();

    assert_eq!(ack.message.as_deref(), Some("Duty accepted"));
    assert_eq!(
        h.aggregator.find(&id("d1")).await.unwrap().status,
        DutyStatus::Scheduled
    );
    assert_eq!(h.server.call_count("accept_assignment"), 1);
    assert_eq!(h.server.call_count("list_duties"), 2);

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Duty accepted");
}

#[rstest]
#[case("completed")]
#[case("scheduled")]
#[case("pending_approval")]
#[case("cancelled")]
#[tokio::test]
async fn test_accept_rejects_non_pending_duty(#[case] status: &str) {
    let h = harness(vec![duty("d1", TODAY, status)]).await;

    let err = h.lifecycle.accept(&id("d1")).await.unwrap_err();

    assert!(matches!(err, RosterError::InvalidTransition { action: "accept", .. }));
    assert_eq!(h.server.call_count("accept_assignment"), 0);
    assert_eq!(h.aggregator.find(&id("d1")).await.unwrap().status.as_str(), status);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\t\n")]
#[tokio::test]
async fn test_blank_decline_reason_never_reaches_the_network(#[case] reason: &str) {
    let mut api = MockRosterApi::new();
    api.expect_list_duties().times(1).returning(|_| {
        Ok(vec![
            duty("d1", TODAY, "pending_acceptance"),
            multi_day(
                "d2",
                "pending_acceptance",
                &[("a", "2025-06-12", "pending_acceptance"), ("b", "2025-06-13", "pending_acceptance")],
            ),
        ])
    });
    api.expect_decline_assignment().never();
    api.expect_decline_all_dates().never();
    api.expect_decline_date().never();

    let api: Arc<dyn RosterApi> = Arc::new(api);
    let aggregator = aggregator(api.clone(), DateRangeMode::Week);
    aggregator.fetch().await.unwrap();
    let lifecycle = DutyLifecycle::new(api, aggregator);

    assert!(matches!(
        lifecycle.decline(&id("d1"), reason).await,
        Err(RosterError::Validation(_))
    ));
    assert!(matches!(
        lifecycle.decline_all_dates(&id("d2"), reason).await,
        Err(RosterError::Validation(_))
    ));
    assert!(matches!(
        lifecycle.decline_date(&id("d2"), &date("a"), reason).await,
        Err(RosterError::Validation(_))
    ));
}

#[tokio::test]
async fn test_decline_sends_trimmed_reason() {
    let mut api = MockRosterApi::new();
    api.expect_list_duties()
        .times(2)
        .returning(|_| Ok(vec![duty("d1", TODAY, "pending_acceptance")]));
    api.expect_decline_assignment()
        .with(predicate::eq(id("d1")), predicate::eq("Exam invigilation"))
        .times(1)
        .returning(|_, _| Ok(Default::default()));

    let api: Arc<dyn RosterApi> = Arc::new(api);
    let aggregator = aggregator(api.clone(), DateRangeMode::Week);
    aggregator.fetch().await.unwrap();
    let lifecycle = DutyLifecycle::new(api, aggregator);

    lifecycle
        .decline(&id("d1"), "  Exam invigilation ")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_decline_records_reason() {
    let h = harness(vec![duty("d1", TODAY, "pending_acceptance")]).await;

    h.lifecycle.decline(&id("d1"), "Clash with exams").await.unwrap();

    let declined = h.aggregator.find(&id("d1")).await.unwrap();
    assert_eq!(declined.status, DutyStatus::Declined);
    assert_eq!(declined.decline_reason.as_deref(), Some("Clash with exams"));
}

#[tokio::test]
async fn test_mark_complete_sets_completion_time() {
    let h = harness(vec![duty("d1", TODAY, "active")]).await;

    h.lifecycle.mark_complete(&id("d1")).await.unwrap();

    let completed = h.aggregator.find(&id("d1")).await.unwrap();
    assert_eq!(completed.status, DutyStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(h.aggregator.summary_counts().await.completed, 1);
}

#[tokio::test]
async fn test_mark_complete_is_one_call_per_duty_while_in_flight() {
    let h = harness(vec![duty("d1", TODAY, "scheduled"), duty("d2", TODAY, "accepted")]).await;
    let gate = h.server.hold_mutations().await;

    let first = {
        let lifecycle = h.lifecycle.clone();
        tokio::spawn(async move { lifecycle.mark_complete(&id("d1")).await })
    };
    wait_until_busy(&h.lifecycle, &ActionKey::duty(&id("d1"))).await;

    let repeat = h.lifecycle.mark_complete(&id("d1")).await;
    assert!(matches!(repeat, Err(RosterError::Busy(ref key)) if key == "d1"));

    let other = {
        let lifecycle = h.lifecycle.clone();
        tokio::spawn(async move { lifecycle.mark_complete(&id("d2")).await })
    };
    wait_until_busy(&h.lifecycle, &ActionKey::duty(&id("d2"))).await;
    assert!(h.lifecycle.is_busy(&ActionKey::duty(&id("d1"))));

    drop(gate);
    first.await.unwrap().unwrap();
    other.await.unwrap().unwrap();

    assert_eq!(h.server.call_count("mark_complete"), 2);
    assert!(!h.lifecycle.is_busy(&ActionKey::duty(&id("d1"))));
    assert!(!h.lifecycle.is_busy(&ActionKey::duty(&id("d2"))));
}

#[tokio::test]
async fn test_mark_complete_requires_started_duty() {
    let h = harness(vec![duty("d1", TODAY, "pending_acceptance")]).await;

    let err = h.lifecycle.mark_complete(&id("d1")).await.unwrap_err();

    assert!(matches!(err, RosterError::InvalidTransition { action: "complete", .. }));
    assert_eq!(h.server.call_count("mark_complete"), 0);
}

#[tokio::test]
async fn test_accept_all_accepts_every_date_and_schedules_parent() {
    let dates = [
        ("a", "2025-06-16", "pending_acceptance"),
        ("b", "2025-06-17", "pending_acceptance"),
        ("c", "2025-06-18", "pending_acceptance"),
        ("d", "2025-06-19", "pending_acceptance"),
        ("e", "2025-06-20", "pending_acceptance"),
    ];
    let h = harness(vec![multi_day("camp", "pending_acceptance", &dates)]).await;

    h.lifecycle.accept_all(&id("camp")).await.unwrap();

    let camp = h.aggregator.find(&id("camp")).await.unwrap();
    assert_eq!(camp.status, DutyStatus::Scheduled);
    assert_eq!(camp.dates.len(), 5);
    assert!(camp.dates.iter().all(|record| record.status == DateStatus::Accepted));
    assert_eq!(h.server.call_count("accept_all_dates"), 1);
    assert_eq!(h.server.call_count("list_assignment_dates"), 1);
}

#[tokio::test]
async fn test_decline_all_dates_declines_parent_and_every_date() {
    let h = harness(vec![multi_day(
        "d1",
        "pending_acceptance",
        &[
            ("a", "2025-06-01", "pending_acceptance"),
            ("b", "2025-06-02", "pending_acceptance"),
            ("c", "2025-06-03", "pending_acceptance"),
        ],
    )])
    .await;

    h.lifecycle
        .decline_all_dates(&id("d1"), "unavailable")
        .await
        .unwrap();

    let d1 = h.aggregator.find(&id("d1")).await.unwrap();
    assert_eq!(d1.status, DutyStatus::Declined);
    assert!(d1.dates.iter().all(|record| record.status == DateStatus::Declined));
    assert!(d1
        .dates
        .iter()
        .all(|record| record.decline_reason.as_deref() == Some("unavailable")));
}

#[tokio::test]
async fn test_bulk_actions_need_a_multi_day_duty_with_pending_dates() {
    let h = harness(vec![
        duty("single", TODAY, "pending_acceptance"),
        multi_day(
            "settled",
            "scheduled",
            &[("a", "2025-06-12", "accepted"), ("b", "2025-06-13", "accepted")],
        ),
    ])
    .await;

    assert!(matches!(
        h.lifecycle.accept_all(&id("single")).await,
        Err(RosterError::InvalidTransition { .. })
    ));
    assert!(matches!(
        h.lifecycle.decline_all_dates(&id("settled"), "busy").await,
        Err(RosterError::InvalidTransition { .. })
    ));
    assert_eq!(h.server.call_count("accept_all_dates"), 0);
    assert_eq!(h.server.call_count("decline_all_dates"), 0);
}

#[tokio::test]
async fn test_accept_date_always_refetches() {
    let h = harness(vec![multi_day(
        "d1",
        "pending_acceptance",
        &[
            ("a", "2025-06-12", "pending_acceptance"),
            ("b", "2025-06-13", "pending_acceptance"),
            ("c", "2025-06-14", "pending_acceptance"),
        ],
    )])
    .await;

    h.lifecycle.accept_date(&id("d1"), &date("a")).await.unwrap();

    let d1 = h.aggregator.find(&id("d1")).await.unwrap();
    assert_eq!(d1.date(&date("a")).unwrap().status, DateStatus::Accepted);
    assert_eq!(d1.status, DutyStatus::PendingAcceptance);
    assert_eq!(h.server.call_count("list_duties"), 2);
}

#[tokio::test]
async fn test_decline_date_patches_locally_when_parent_is_unchanged() {
    let h = harness(vec![multi_day(
        "d1",
        "pending_acceptance",
        &[
            ("a", "2025-06-12", "pending_acceptance"),
            ("b", "2025-06-13", "pending_acceptance"),
        ],
    )])
    .await;

    h.lifecycle
        .decline_date(&id("d1"), &date("a"), "dentist")
        .await
        .unwrap();

    let d1 = h.aggregator.find(&id("d1")).await.unwrap();
    let record = d1.date(&date("a")).unwrap();
    assert_eq!(record.status, DateStatus::Declined);
    assert_eq!(record.decline_reason.as_deref(), Some("dentist"));
    assert_eq!(h.server.call_count("list_duties"), 1);
}

#[tokio::test]
async fn test_decline_of_last_pending_date_refetches_parent() {
    let h = harness(vec![multi_day(
        "d1",
        "pending_acceptance",
        &[
            ("a", "2025-06-12", "accepted"),
            ("b", "2025-06-13", "pending_acceptance"),
        ],
    )])
    .await;

    h.lifecycle
        .decline_date(&id("d1"), &date("b"), "dentist")
        .await
        .unwrap();

    assert_eq!(h.server.call_count("list_duties"), 2);
    let d1 = h.aggregator.find(&id("d1")).await.unwrap();
    assert_eq!(d1.status, DutyStatus::Scheduled);
}

#[tokio::test]
async fn test_complete_date_refetches_only_when_parent_flips() {
    let h = harness(vec![multi_day(
        "d1",
        "scheduled",
        &[("a", "2025-06-11", "accepted"), ("b", "2025-06-12", "accepted")],
    )])
    .await;

    h.lifecycle.complete_date(&id("d1"), &date("a")).await.unwrap();
    assert_eq!(h.server.call_count("list_duties"), 1);

    h.lifecycle.complete_date(&id("d1"), &date("b")).await.unwrap();
    assert_eq!(h.server.call_count("list_duties"), 2);
    assert_eq!(
        h.aggregator.find(&id("d1")).await.unwrap().status,
        DutyStatus::Completed
    );
}

#[tokio::test]
async fn test_complete_date_requires_accepted_date() {
    let h = harness(vec![multi_day(
        "d1",
        "pending_acceptance",
        &[
            ("a", "2025-06-12", "pending_acceptance"),
            ("b", "2025-06-13", "pending_acceptance"),
        ],
    )])
    .await;

    let err = h
        .lifecycle
        .complete_date(&id("d1"), &date("a"))
        .await
        .unwrap_err();

    assert!(matches!(err, RosterError::InvalidTransition { .. }));
    assert_eq!(h.server.call_count("complete_date"), 0);
}

#[tokio::test]
async fn test_unknown_duty_or_date_is_not_found() {
    let h = harness(vec![duty("d1", TODAY, "pending_acceptance")]).await;

    assert!(matches!(
        h.lifecycle.accept(&id("nope")).await,
        Err(RosterError::NotFound(_))
    ));
    assert!(matches!(
        h.lifecycle.accept_date(&id("d1"), &date("z")).await,
        Err(RosterError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_remote_failure_leaves_state_and_releases_token() {
    let h = harness(vec![duty("d1", TODAY, "pending_acceptance")]).await;
    let mut notices = h.lifecycle.subscribe();

    h.server.fail_next("Roster is locked");
    let err = h.lifecycle.accept(&id("d1")).await.unwrap_err();

    assert!(matches!(err, RosterError::Remote(ref message) if message == "Roster is locked"));
    assert_eq!(
        h.aggregator.find(&id("d1")).await.unwrap().status,
        DutyStatus::PendingAcceptance
    );
    assert!(!h.lifecycle.is_busy(&ActionKey::duty(&id("d1"))));
    assert_eq!(h.server.call_count("list_duties"), 1);

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("Roster is locked"));

    h.lifecycle.accept(&id("d1")).await.unwrap();
}

#[tokio::test]
async fn test_hung_request_times_out_and_clears_token() {
    let h = harness(vec![duty("d1", TODAY, "scheduled")]).await;
    let lifecycle = DutyLifecycle::new(
        Arc::new(h.server.clone()),
        h.aggregator.clone(),
    )
    .with_timeout(Duration::from_millis(100));
    let gate = h.server.hold_mutations().await;

    let err = lifecycle.mark_complete(&id("d1")).await.unwrap_err();

    assert!(matches!(err, RosterError::Timeout(_)));
    assert!(!lifecycle.is_busy(&ActionKey::duty(&id("d1"))));
    assert_eq!(
        h.aggregator.find(&id("d1")).await.unwrap().status,
        DutyStatus::Scheduled
    );
    drop(gate);
}

#[tokio::test]
async fn test_failed_refresh_keeps_local_patch() {
    let mut api = MockRosterApi::new();
    let mut listings = 0;
    api.expect_list_duties().times(2).returning(move |_| {
        listings += 1;
        if listings == 1 {
            Ok(vec![duty("d1", TODAY, "pending_acceptance")])
        } else {
            Err(RosterError::Remote("Service unavailable".to_string()))
        }
    });
    api.expect_accept_assignment()
        .times(1)
        .returning(|_| Ok(Default::default()));

    let api: Arc<dyn RosterApi> = Arc::new(api);
    let aggregator = aggregator(api.clone(), DateRangeMode::Week);
    aggregator.fetch().await.unwrap();
    let lifecycle = DutyLifecycle::new(api, aggregator.clone());
    let mut notices = lifecycle.subscribe();

    lifecycle.accept(&id("d1")).await.unwrap();

    assert_eq!(
        aggregator.find(&id("d1")).await.unwrap().status,
        DutyStatus::Scheduled
    );
    assert_eq!(notices.recv().await.unwrap().level, NoticeLevel::Warning);
    let success = notices.recv().await.unwrap();
    assert_eq!(success.level, NoticeLevel::Success);
    assert_eq!(success.message, "Duty accepted");
}

#[tokio::test]
async fn test_accept_all_keeps_parent_when_dates_cannot_be_reloaded() {
    let camp = multi_day(
        "camp",
        "pending_acceptance",
        &[("a", "2025-06-12", "pending_acceptance"), ("b", "2025-06-13", "pending_acceptance")],
    );
    let mut api = MockRosterApi::new();
    let mut listings = 0;
    api.expect_list_duties().times(2).returning(move |_| {
        listings += 1;
        if listings == 1 {
            Ok(vec![camp.clone()])
        } else {
            Err(RosterError::Remote("Service unavailable".to_string()))
        }
    });
    api.expect_accept_all_dates()
        .times(1)
        .returning(|_| Ok(Default::default()));
    api.expect_list_assignment_dates()
        .times(1)
        .returning(|_| Err(RosterError::Remote("Service unavailable".to_string())));

    let api: Arc<dyn RosterApi> = Arc::new(api);
    let aggregator = aggregator(api.clone(), DateRangeMode::Week);
    aggregator.fetch().await.unwrap();
    let lifecycle = DutyLifecycle::new(api, aggregator.clone());

    lifecycle.accept_all(&id("camp")).await.unwrap();

    let camp = aggregator.find(&id("camp")).await.unwrap();
    assert_eq!(camp.status, DutyStatus::PendingAcceptance);
    assert_eq!(camp.derived_status(), Some(camp.status));
    assert!(camp.dates.iter().all(|record| record.status == DateStatus::PendingAcceptance));
}

#[tokio::test]
async fn test_late_completion_leaves_closed_view_untouched() {
    let h = harness(vec![duty("d1", TODAY, "scheduled")]).await;
    let gate = h.server.hold_mutations().await;

    let pending = {
        let lifecycle = h.lifecycle.clone();
        tokio::spawn(async move { lifecycle.mark_complete(&id("d1")).await })
    };
    wait_until_busy(&h.lifecycle, &ActionKey::duty(&id("d1"))).await;
    h.aggregator.close();
    drop(gate);
    pending.await.unwrap().unwrap();

    assert_eq!(
        h.aggregator.find(&id("d1")).await.unwrap().status,
        DutyStatus::Scheduled
    );
    assert_eq!(h.server.call_count("list_duties"), 1);
    assert!(
        h.aggregator
            .update(&id("d1"), |duty| duty.status = DutyStatus::Active)
            .await
            .is_none()
    );
}

#[rstest]
#[case("pending_acceptance", vec![DutyAction::Accept, DutyAction::Decline])]
#[case("scheduled", vec![DutyAction::MarkComplete])]
#[case("accepted", vec![DutyAction::MarkComplete])]
#[case("active", vec![DutyAction::MarkComplete])]
#[case("pending_approval", vec![])]
#[case("completed", vec![])]
fn test_single_day_actions(#[case] status: &str, #[case] expected: Vec<DutyAction>) {
    assert_eq!(available_actions(&duty("d1", TODAY, status)), expected);
}

#[test]
fn test_multi_day_actions_follow_dates() {
    let pending = multi_day(
        "d1",
        "pending_acceptance",
        &[("a", "2025-06-12", "pending_acceptance"), ("b", "2025-06-13", "accepted")],
    );
    assert_eq!(
        available_actions(&pending),
        vec![DutyAction::AcceptAll, DutyAction::DeclineAll]
    );
    assert_eq!(date_actions(&pending.dates[0]), vec![DateAction::Accept, DateAction::Decline]);
    assert_eq!(date_actions(&pending.dates[1]), vec![DateAction::Complete]);

    let settled = multi_day(
        "d2",
        "scheduled",
        &[("a", "2025-06-12", "completed"), ("b", "2025-06-13", "declined")],
    );
    assert!(available_actions(&settled).is_empty());
    assert!(date_actions(&settled.dates[0]).is_empty());
}

#[test]
fn test_reason_validation_trims() {
    assert_eq!(validate_reason("  sick ").unwrap(), "sick");
    assert!(validate_reason(" ").is_err());
}

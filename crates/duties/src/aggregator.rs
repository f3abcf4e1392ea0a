use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{Days, NaiveDate};
use dutyroster_client::RosterApi;
use dutyroster_core::{
    date_range::{DateRange, DateRangeMode},
    errors::{RosterError, RosterResult},
    models::{
        api::Assignee,
        calendar::{UNKNOWN_DATE, format_date, format_long_date},
        duty::{DutyAssignment, DutyId},
        status::DutyStatus,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status pill selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(DutyStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: DutyStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        DutyStatus::parse(code)
            .map(StatusFilter::Only)
            .ok_or_else(|| RosterError::Validation(format!("unknown status filter: {}", code)))
    }
}

/// Duties starting on one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DateGroup {
    /// `YYYY-MM-DD`, or empty for duties without a usable start date
    pub key: String,
    pub date: Option<NaiveDate>,
    pub label: String,
    pub duties: Vec<DutyAssignment>,
}

/// Stat-card counts over the unfiltered snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryCounts {
    pub total: usize,
    pub scheduled: usize,
    pub active: usize,
    pub completed: usize,
    pub pending: usize,
}

/// `Today`, `Tomorrow`, `Yesterday`, or `"Thursday, Jun 12"`.
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.checked_add_days(Days::new(1)) {
        "Tomorrow".to_string()
    } else if Some(date) == today.checked_sub_days(Days::new(1)) {
        "Yesterday".to_string()
    } else {
        format_long_date(date)
    }
}

pub fn filter_and_sort(duties: &[DutyAssignment], filter: StatusFilter) -> Vec<DutyAssignment> {
    let mut selected: Vec<DutyAssignment> = duties
        .iter()
        .filter(|duty| filter.matches(duty.status))
        .cloned()
        .collect();
    selected.sort_by_cached_key(|duty| duty.sort_key());
    selected
}

/// Buckets duties by start date in ascending date order, whatever order
/// they arrive in. Undated duties trail in an "Unknown Date" bucket.
pub fn group_by_date(duties: &[DutyAssignment], today: NaiveDate) -> Vec<DateGroup> {
    let mut dated: BTreeMap<NaiveDate, Vec<DutyAssignment>> = BTreeMap::new();
    let mut undated = Vec::new();

    for duty in duties {
        match duty.start_date.date() {
            Some(date) => dated.entry(date).or_default().push(duty.clone()),
            None => undated.push(duty.clone()),
        }
    }

    let mut groups: Vec<DateGroup> = dated
        .into_iter()
        .map(|(date, duties)| DateGroup {
            key: format_date(date),
            date: Some(date),
            label: date_label(date, today),
            duties,
        })
        .collect();

    if !undated.is_empty() {
        groups.push(DateGroup {
            key: String::new(),
            date: None,
            label: UNKNOWN_DATE.to_string(),
            duties: undated,
        });
    }
    groups
}

pub fn summary_counts(duties: &[DutyAssignment]) -> SummaryCounts {
    let mut counts = SummaryCounts {
        total: duties.len(),
        ..SummaryCounts::default()
    };
    for duty in duties {
        match duty.status.effective() {
            DutyStatus::Scheduled => counts.scheduled += 1,
            DutyStatus::Active => counts.active += 1,
            DutyStatus::Completed => counts.completed += 1,
            status if status.is_pending() => counts.pending += 1,
            _ => {}
        }
    }
    counts
}

pub fn covering(duties: &[DutyAssignment], day: NaiveDate) -> Vec<DutyAssignment> {
    duties
        .iter()
        .filter(|duty| duty.covers(day))
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
struct Selection {
    assignee: Assignee,
    mode: DateRangeMode,
}

#[derive(Debug, Default)]
struct Snapshot {
    duties: Vec<DutyAssignment>,
    applied_seq: u64,
}

/// Owns one view's snapshot of an assignee's duties.
///
/// Overlapping fetches are allowed; each takes a sequence number and a
/// response older than the last one applied is dropped, so the most
/// recently issued request wins. After [`close`](Self::close) every late
/// response is ignored.
pub struct DutyAggregator {
    api: Arc<dyn RosterApi>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    selection: RwLock<Selection>,
    snapshot: RwLock<Snapshot>,
    issued: AtomicU64,
    closed: AtomicBool,
}

impl DutyAggregator {
    pub fn new(api: Arc<dyn RosterApi>, assignee: Assignee, mode: DateRangeMode) -> Self {
        Self {
            api,
            clock: Arc::new(SystemClock),
            timeout: DEFAULT_TIMEOUT,
            selection: RwLock::new(Selection { assignee, mode }),
            snapshot: RwLock::new(Snapshot::default()),
            issued: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn assignee(&self) -> Assignee {
        self.selection.read().await.assignee.clone()
    }

    pub async fn mode(&self) -> DateRangeMode {
        self.selection.read().await.mode
    }

    /// Current fetch window.
    pub async fn range(&self) -> DateRange {
        DateRange::for_mode(self.mode().await, self.today())
    }

    /// Changes whose duties are shown. Call [`fetch`](Self::fetch) afterwards.
    pub async fn set_assignee(&self, assignee: Assignee) {
        self.selection.write().await.assignee = assignee;
    }

    pub async fn set_mode(&self, mode: DateRangeMode) {
        self.selection.write().await.mode = mode;
    }

    /// Reloads the snapshot. Returns how many duties were received.
    ///
    /// Without a selected assignee the snapshot is cleared and the API is
    /// not called. On failure the previous snapshot is kept.
    pub async fn fetch(&self) -> RosterResult<usize> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let (assignee, mode) = {
            let selection = self.selection.read().await;
            (selection.assignee.clone(), selection.mode)
        };
        let range = DateRange::for_mode(mode, self.today());

        let Some(query) = assignee.query(range) else {
            debug!("No assignee selected, clearing duties");
            self.apply(seq, Vec::new()).await;
            return Ok(0);
        };

        debug!(
            "Fetching duties for {} {} ({} window {})",
            query.assignee_type, query.assignee_id, mode, range
        );
        let duties = match tokio::time::timeout(self.timeout, self.api.list_duties(&query)).await {
            Ok(Ok(duties)) => duties,
            Ok(Err(e)) => {
                warn!("Failed to fetch duties for {}: {}", query.assignee_id, e);
                return Err(e);
            }
            Err(_) => {
                warn!("Fetching duties for {} timed out", query.assignee_id);
                return Err(RosterError::Timeout(self.timeout.as_secs()));
            }
        };

        for duty in &duties {
            if let Err(e) = duty.validate() {
                warn!("{}", e);
            }
        }

        let count = duties.len();
        if self.apply(seq, duties).await {
            info!("Loaded {} duties for {}", count, query.assignee_id);
        }
        Ok(count)
    }

    async fn apply(&self, seq: u64, duties: Vec<DutyAssignment>) -> bool {
        if self.is_closed() {
            debug!("Aggregator closed, discarding response #{}", seq);
            return false;
        }
        let mut snapshot = self.snapshot.write().await;
        if seq < snapshot.applied_seq {
            debug!(
                "Discarding stale response #{} (already applied #{})",
                seq, snapshot.applied_seq
            );
            return false;
        }
        snapshot.applied_seq = seq;
        snapshot.duties = duties;
        true
    }

    /// Stops applying responses, like a view that has gone away.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Unfiltered snapshot in the order received.
    pub async fn duties(&self) -> Vec<DutyAssignment> {
        self.snapshot.read().await.duties.clone()
    }

    pub async fn find(&self, duty_id: &DutyId) -> Option<DutyAssignment> {
        self.snapshot
            .read()
            .await
            .duties
            .iter()
            .find(|duty| &duty.id == duty_id)
            .cloned()
    }

    /// Patches one duty in place. Returns `None` if it is not in the snapshot
    /// or the aggregator has been closed.
    pub async fn update<R>(
        &self,
        duty_id: &DutyId,
        patch: impl FnOnce(&mut DutyAssignment) -> R,
    ) -> Option<R> {
        if self.is_closed() {
            debug!("Aggregator closed, discarding patch of duty {}", duty_id);
            return None;
        }
        let mut snapshot = self.snapshot.write().await;
        snapshot
            .duties
            .iter_mut()
            .find(|duty| &duty.id == duty_id)
            .map(patch)
    }

    pub async fn filtered_and_sorted(&self, filter: StatusFilter) -> Vec<DutyAssignment> {
        filter_and_sort(&self.snapshot.read().await.duties, filter)
    }

    pub async fn group_by_date(&self, filter: StatusFilter) -> Vec<DateGroup> {
        let sorted = self.filtered_and_sorted(filter).await;
        group_by_date(&sorted, self.today())
    }

    pub async fn summary_counts(&self) -> SummaryCounts {
        summary_counts(&self.snapshot.read().await.duties)
    }

    /// Duties running today, whatever the current window.
    pub async fn today_only(&self) -> Vec<DutyAssignment> {
        covering(&self.snapshot.read().await.duties, self.today())
    }
}

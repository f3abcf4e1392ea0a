//! # Duty Views
//!
//! Client-side bookkeeping for a caller's duty roster.
//!
//! ## Architecture
//!
//! - **Aggregator**: fetches duties for a date window and derives the
//!   filtered, grouped and counted views
//! - **Lifecycle**: accept / decline / complete transitions with one
//!   in-flight action per entity and re-aggregation afterwards
//! - **In-flight**: the per-entity action registry behind the lifecycle
//! - **Notice**: non-blocking success and failure notifications
//! - **Clock**: source of the local "today"

/// Fetching and derived views
pub mod aggregator;
/// Source of the local calendar date
pub mod clock;
/// Per-entity in-flight action registry
pub mod in_flight;
/// Status transitions
pub mod lifecycle;
/// User-facing notifications
pub mod notice;

pub use aggregator::{DateGroup, DutyAggregator, StatusFilter, SummaryCounts};
pub use clock::{Clock, FixedClock, SystemClock};
pub use in_flight::{ActionKey, ActionToken, InFlightActions};
pub use lifecycle::{DateAction, DutyAction, DutyLifecycle};
pub use notice::{Notice, NoticeLevel};

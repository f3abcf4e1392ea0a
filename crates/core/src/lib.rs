//! # Duty Roster Core
//!
//! Shared vocabulary of the roster client: duty assignments and their date
//! records, status enums with display metadata, the date-range policy and the
//! error type every other crate returns.

pub mod date_range;
pub mod errors;
pub mod models;

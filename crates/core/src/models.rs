pub mod api;
pub mod calendar;
pub mod duty;
pub mod status;

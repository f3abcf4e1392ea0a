//! # Duty Roster Client
//!
//! Adapter between the duty views and the school's roster REST API.
//!
//! - **api**: the [`RosterApi`](api::RosterApi) contract every backend implements
//! - **http**: the reqwest-backed implementation used in production
//! - **config**: environment configuration and logging setup
//! - **session**: the authenticated caller, injected rather than read from globals
//! - **mock**: test doubles for the contract

/// The roster API contract
pub mod api;
/// Environment configuration and tracing setup
pub mod config;
/// HTTP implementation of the roster API
pub mod http;
/// Test doubles for the roster API
pub mod mock;
/// Authenticated session context
pub mod session;

pub use api::RosterApi;
pub use http::HttpRosterApi;
pub use session::Session;

//! # Client Configuration Module
//!
//! Loads the roster client's settings from environment variables.
//!
//! ## Environment Variables
//!
//! - `ROSTER_API_BASE_URL`: Base URL of the roster API (required)
//! - `ROSTER_API_TOKEN`: Bearer token of the signed-in user
//! - `ROSTER_USER_ID`: Id of the signed-in user
//! - `ROSTER_ASSIGNEE_ID`: Whose duties to show (defaults to the signed-in user)
//! - `ROSTER_ASSIGNEE_TYPE`: `teacher`, `student` or `staff` (default: "teacher")
//! - `ROSTER_VIEW_MODE`: `today`, `week`, `month` or `all` (default: "week")
//! - `ROSTER_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `LOG_LEVEL`: Logging level (default: "info")

use std::env;
use std::time::Duration;

use eyre::{Result, WrapErr, eyre};
use dutyroster_core::{date_range::DateRangeMode, models::api::AssigneeType};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Configuration for the roster client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the roster API, without a trailing slash
    pub base_url: String,

    /// Bearer token sent with every request
    pub api_token: Option<String>,

    /// Id of the signed-in user
    pub user_id: Option<String>,

    /// Assignee whose duties are shown, when different from the user
    pub assignee_id: Option<String>,

    pub assignee_type: AssigneeType,

    pub view_mode: DateRangeMode,

    /// Request timeout in seconds
    pub request_timeout: u64,

    pub log_level: Level,
}

impl ClientConfig {
    /// Creates a new ClientConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - `ROSTER_API_BASE_URL` is not set or is not an http(s) URL
    /// - `ROSTER_ASSIGNEE_TYPE` or `ROSTER_VIEW_MODE` hold an unknown value
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("ROSTER_API_BASE_URL")
            .wrap_err("ROSTER_API_BASE_URL environment variable must be set")?;
        let base_url = normalize_base_url(&base_url)?;

        let api_token = non_empty_var("ROSTER_API_TOKEN");
        let user_id = non_empty_var("ROSTER_USER_ID");
        let assignee_id = non_empty_var("ROSTER_ASSIGNEE_ID");

        let assignee_type = env::var("ROSTER_ASSIGNEE_TYPE")
            .unwrap_or_else(|_| "teacher".to_string())
            .parse::<AssigneeType>()
            .map_err(|e| eyre!("Invalid ROSTER_ASSIGNEE_TYPE value: {}", e))?;

        let view_mode = env::var("ROSTER_VIEW_MODE")
            .unwrap_or_else(|_| "week".to_string())
            .parse::<DateRangeMode>()
            .map_err(|e| eyre!("Invalid ROSTER_VIEW_MODE value: {}", e))?;

        let request_timeout = env::var("ROSTER_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let log_level = parse_log_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

        Ok(Self {
            base_url,
            api_token,
            user_id,
            assignee_id,
            assignee_type,
            view_mode,
            request_timeout,
            log_level,
        })
    }

    /// Minimal configuration pointing at `base_url`, with defaults elsewhere.
    pub fn for_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            api_token: None,
            user_id: None,
            assignee_id: None,
            assignee_type: AssigneeType::Teacher,
            view_mode: DateRangeMode::Week,
            request_timeout: 30,
            log_level: Level::INFO,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Installs the global tracing subscriber at the configured level.
/// `RUST_LOG`, when set, takes precedence.
pub fn init_tracing(config: &ClientConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_ascii_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

pub fn parse_log_level(raw: &str) -> Level {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(eyre!("Roster API base URL must start with http:// or https://, got {:?}", raw));
    }
    Ok(trimmed.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

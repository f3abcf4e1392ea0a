use std::sync::Arc;

use color_eyre::eyre::Result;
use dotenv::dotenv;
use dutyroster_client::{
    HttpRosterApi, RosterApi, Session,
    config::{ClientConfig, init_tracing},
};
use dutyroster_duties::{DutyAggregator, StatusFilter, lifecycle::available_actions};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ClientConfig::from_env()?;
    init_tracing(&config)?;

    // Optional status filter, e.g. `duty-digest pending_acceptance`
    let filter = match std::env::args().nth(1) {
        Some(raw) => raw.parse::<StatusFilter>()?,
        None => StatusFilter::All,
    };

    let session = Session::from_config(&config);
    let assignee = session.assignee_for(config.assignee_id.as_deref(), config.assignee_type);
    let api: Arc<dyn RosterApi> = Arc::new(HttpRosterApi::new(&config, session)?);
    let aggregator = DutyAggregator::new(api, assignee, config.view_mode)
        .with_timeout(config.request_timeout());

    info!(
        "Building {} duty digest for {}",
        aggregator.mode().await,
        aggregator.range().await
    );

    if let Err(e) = aggregator.fetch().await {
        error!("Could not load duties: {}", e);
        return Err(e.into());
    }

    for group in aggregator.group_by_date(filter).await {
        info!("{} ({} duties)", group.label, group.duties.len());
        for duty in &group.duties {
            let actions = available_actions(duty);
            info!(
                "  {} | {} | {} | {}{}",
                duty.time_label(),
                duty.duty_name,
                duty.status.style().label,
                duty.location_name.as_deref().unwrap_or("-"),
                if actions.is_empty() {
                    String::new()
                } else {
                    format!(" | {:?}", actions)
                }
            );
        }
    }

    let counts = aggregator.summary_counts().await;
    info!(
        "Total {} | scheduled {} | active {} | completed {} | pending {}",
        counts.total, counts.scheduled, counts.active, counts.completed, counts.pending
    );

    Ok(())
}

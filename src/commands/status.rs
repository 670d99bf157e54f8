use anyhow::{Context, Result, bail};

use icsync_core::config::Config;
use icsync_core::feed::parse_feed;
use icsync_core::state::SyncState;
use icsync_core::store::TargetStore;
use icsync_core::sync::{SyncPlan, snapshot};
use icsync_google::{Credentials, GoogleStore};

use crate::fetch::{FetchOutcome, fetch_feed};
use crate::render;

/// Compute and print the plan a sync would apply, without writing anything:
/// no mutations, no state update.
pub async fn run() -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    let http = reqwest::Client::new();

    // Fetch unconditionally so status works even when the feed is unchanged.
    let outcome = fetch_feed(&http, &config.ics_url, &SyncState::default()).await?;
    let body = match outcome {
        FetchOutcome::Fetched { body, .. } => body,
        FetchOutcome::NotModified => bail!("Feed server answered 304 to an unconditional request"),
    };

    let resolver = super::sync::build_resolver(&config)?;

    let events = parse_feed(&body)?;
    let kept = snapshot(
        &events,
        &resolver,
        chrono::Utc::now(),
        chrono::Duration::days(config.past_days),
    )?;

    let credentials = Credentials::load(&config.credentials_path)?;
    let store = GoogleStore::connect(&credentials, &config.target_calendar_id).await?;

    let existing = store.list_managed().await?;
    let plan = SyncPlan::compute(&kept, &existing);

    println!("{}", render::render_plan(&plan));

    Ok(())
}

use anyhow::{Context, Result};

use icsync_core::config::Config;
use icsync_core::feed::parse_feed;
use icsync_core::state::{SyncState, md5_hex};
use icsync_core::store::TargetStore;
use icsync_core::sync::{SyncPlan, snapshot};
use icsync_core::timezone::{TzResolver, UnknownZonePolicy, windows_aliases};
use icsync_google::{Credentials, GoogleStore};

use crate::fetch::{FetchOutcome, fetch_feed};
use crate::render;

pub async fn run() -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    let http = reqwest::Client::new();

    let state = SyncState::load(&config.state_file);

    let outcome = fetch_feed(&http, &config.ics_url, &state).await?;
    let (body, etag, last_modified) = match outcome {
        FetchOutcome::NotModified => {
            println!("Feed not modified (304), nothing to do");
            return Ok(());
        }
        FetchOutcome::Fetched {
            body,
            etag,
            last_modified,
        } => (body, etag, last_modified),
    };

    let hash = md5_hex(body.as_bytes());
    if state.hash.as_deref() == Some(hash.as_str()) {
        println!("Feed content unchanged, nothing to do");
        return Ok(());
    }

    // Record the new revision before mutating: a crash mid-sync must not
    // make every future run reprocess an unchanged document.
    SyncState {
        etag,
        last_modified,
        hash: Some(hash),
    }
    .save(&config.state_file)
    .with_context(|| format!("Failed to write {}", config.state_file.display()))?;

    let resolver = build_resolver(&config)?;

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

    render::print_recurrence_mutations(&plan);

    let stats = plan.apply(&store).await?;

    println!(
        "Synced: {} created, {} updated, {} deleted, {} unchanged",
        stats.created, stats.updated, stats.deleted, stats.unchanged
    );

    Ok(())
}

pub fn build_resolver(config: &Config) -> Result<TzResolver> {
    let policy = if config.strict_timezones {
        UnknownZonePolicy::Strict
    } else {
        UnknownZonePolicy::Lenient
    };
    Ok(TzResolver::new(&config.timezone, windows_aliases(), policy)?)
}

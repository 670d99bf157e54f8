//! Conditional feed download.

use anyhow::{Context, Result, bail};

use icsync_core::state::SyncState;

pub enum FetchOutcome {
    /// The server answered 304; the document is untouched.
    NotModified,
    Fetched {
        body: String,
        etag: Option<String>,
        last_modified: Option<String>,
    },
}

/// GET the feed, sending If-None-Match / If-Modified-Since from the last
/// run's state so an untouched document costs a single round-trip.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    state: &SyncState,
) -> Result<FetchOutcome> {
    let mut request = client.get(url);
    if let Some(ref etag) = state.etag {
        request = request.header(reqwest::header::IF_NONE_MATCH, etag.as_str());
    }
    if let Some(ref last_modified) = state.last_modified {
        request = request.header(reqwest::header::IF_MODIFIED_SINCE, last_modified.as_str());
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("Failed to fetch {url}"))?;

    if response.status() == reqwest::StatusCode::NOT_MODIFIED {
        return Ok(FetchOutcome::NotModified);
    }
    if !response.status().is_success() {
        bail!("Feed fetch returned {} for {url}", response.status());
    }

    let etag = header_value(&response, reqwest::header::ETAG);
    let last_modified = header_value(&response, reqwest::header::LAST_MODIFIED);

    let body = response.text().await.context("Failed to read feed body")?;

    Ok(FetchOutcome::Fetched {
        body,
        etag,
        last_modified,
    })
}

fn header_value(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

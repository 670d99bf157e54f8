//! Calendar v3 event operations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use icsync_core::event::SOURCE_TAG;
use icsync_core::store::TargetStore;
use icsync_core::{EventResource, IcsyncError, IcsyncResult, StoredEvent};

use crate::auth::{Credentials, fetch_access_token};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PAGE_SIZE: u32 = 2500;

/// Google Calendar store client for one target calendar.
pub struct GoogleStore {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    calendar_id: String,
}

impl GoogleStore {
    /// Build a client, exchanging the refresh token once up front.
    pub async fn connect(credentials: &Credentials, calendar_id: &str) -> IcsyncResult<GoogleStore> {
        Self::connect_to(API_BASE, TOKEN_URL, credentials, calendar_id).await
    }

    /// Like [`GoogleStore::connect`], against explicit endpoints (tests).
    pub async fn connect_to(
        base_url: &str,
        token_url: &str,
        credentials: &Credentials,
        calendar_id: &str,
    ) -> IcsyncResult<GoogleStore> {
        let client = reqwest::Client::new();
        let access_token = fetch_access_token(&client, token_url, credentials).await?;

        Ok(GoogleStore {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            calendar_id: calendar_id.to_string(),
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    async fn check(
        &self,
        response: reqwest::Result<reqwest::Response>,
        action: &str,
    ) -> IcsyncResult<reqwest::Response> {
        let response =
            response.map_err(|e| IcsyncError::Store(format!("{action} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IcsyncError::Store(format!("{action} returned {status}: {body}")));
        }

        Ok(response)
    }

    async fn stored(&self, response: reqwest::Response, action: &str) -> IcsyncResult<StoredEvent> {
        let event: GoogleEvent = response
            .json()
            .await
            .map_err(|e| IcsyncError::Store(format!("invalid {action} response: {e}")))?;
        Ok(event.into_stored())
    }
}

#[async_trait]
impl TargetStore for GoogleStore {
    async fn list_managed(&self) -> IcsyncResult<Vec<StoredEvent>> {
        let time_min = Utc::now().to_rfc3339();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.events_url())
                .bearer_auth(&self.access_token)
                .query(&[
                    ("privateExtendedProperty", format!("src={SOURCE_TAG}")),
                    ("timeMin", time_min.clone()),
                    ("singleEvents", "false".to_string()),
                    ("maxResults", PAGE_SIZE.to_string()),
                ]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self.check(request.send().await, "list").await?;
            let page: EventsPage = response
                .json()
                .await
                .map_err(|e| IcsyncError::Store(format!("invalid list response: {e}")))?;

            for item in page.items {
                let stored = item.into_stored();
                // Only our own prior writes carry the identity annotation.
                if !stored.uid.is_empty() {
                    events.push(stored);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }

    async fn insert(&self, resource: &EventResource) -> IcsyncResult<StoredEvent> {
        let response = self
            .check(
                self.client
                    .post(self.events_url())
                    .bearer_auth(&self.access_token)
                    .json(resource)
                    .send()
                    .await,
                "insert",
            )
            .await?;
        self.stored(response, "insert").await
    }

    async fn patch(&self, event_id: &str, resource: &EventResource) -> IcsyncResult<StoredEvent> {
        let response = self
            .check(
                self.client
                    .patch(self.event_url(event_id))
                    .bearer_auth(&self.access_token)
                    .json(resource)
                    .send()
                    .await,
                "patch",
            )
            .await?;
        self.stored(response, "patch").await
    }

    async fn delete(&self, event_id: &str) -> IcsyncResult<()> {
        let response = self
            .client
            .delete(self.event_url(event_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| IcsyncError::Store(format!("delete request failed: {e}")))?;

        let status = response.status();
        // 410 means the event is already gone, which is what we wanted.
        if status.is_success() || status == reqwest::StatusCode::GONE {
            Ok(())
        } else {
            Err(IcsyncError::Store(format!("delete returned {status}")))
        }
    }
}

#[derive(Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct GoogleEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "extendedProperties")]
    extended_properties: Option<GoogleExtendedProperties>,
}

#[derive(Deserialize)]
struct GoogleExtendedProperties {
    #[serde(default)]
    private: HashMap<String, String>,
}

impl GoogleEvent {
    fn into_stored(self) -> StoredEvent {
        let private = self
            .extended_properties
            .map(|p| p.private)
            .unwrap_or_default();
        StoredEvent {
            id: self.id,
            uid: private.get("uid").cloned().unwrap_or_default(),
            fingerprint: private.get("fp").cloned(),
        }
    }
}

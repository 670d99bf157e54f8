//! Canonical target-calendar resources.
//!
//! These types serialize directly as Calendar API event bodies. The feed
//! parser produces [`crate::feed::FeedEvent`] values; the canonicalizer
//! turns each of them into an [`EventResource`] keyed by identity, and the
//! reconciler works exclusively with those.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Annotation value marking an event as written by this tool.
pub const SOURCE_TAG: &str = "ics_feed";

/// A canonical event as it is written to the target calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResource {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    /// RRULE / EXDATE / RDATE lines, master events only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    pub extended_properties: ExtendedProperties,
}

impl EventResource {
    /// Identity this resource is keyed by across runs.
    pub fn uid(&self) -> &str {
        &self.extended_properties.private.uid
    }

    /// Content fingerprint recorded in the private annotation.
    pub fn fingerprint(&self) -> &str {
        &self.extended_properties.private.fp
    }
}

/// Either a calendar date (all-day) or a zoned instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDateTime {
    Date {
        date: NaiveDate,
    },
    DateTime {
        #[serde(rename = "dateTime")]
        date_time: String,
        #[serde(rename = "timeZone")]
        time_zone: String,
    },
}

impl EventDateTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventDateTime::Date { .. })
    }
}

/// Wrapper matching the store's `extendedProperties` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    pub private: SyncAnnotation,
}

/// The private annotation block carried by every event we write.
///
/// `uid` is the identity used to recognize our own prior writes; `fp` is the
/// content fingerprint used for no-op detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncAnnotation {
    pub src: String,
    pub uid: String,
    pub fp: String,
}

/// A sync-managed event as it currently exists in the target store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Store-assigned opaque id, used for patch/delete calls.
    pub id: String,
    /// Identity read back from the private annotation.
    pub uid: String,
    /// Fingerprint recorded at the last write, if any.
    pub fingerprint: Option<String>,
}

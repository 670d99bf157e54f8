//! Per-event canonicalization.
//!
//! Turns one parsed feed event into its identity and the canonical resource
//! written to the target calendar: working-zone selection, start/end
//! normalization, recurrence-line assembly and content fingerprinting.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::IcsyncResult;
use crate::event::{EventDateTime, EventResource, ExtendedProperties, SOURCE_TAG, SyncAnnotation};
use crate::feed::{FeedEvent, FeedTime};
use crate::normalize::normalize;
use crate::recurrence::{DateListKind, encode_dates, encode_rule, parse_rule};
use crate::timezone::{EventZone, TzResolver};

/// Convert one feed event into `(identity, canonical resource)`.
///
/// Deterministic for identical input, whatever the feed's field order or
/// RRULE key casing; never mutates its input.
pub fn canonicalize(
    event: &FeedEvent,
    resolver: &TzResolver,
) -> IcsyncResult<(String, EventResource)> {
    // The event's working zone comes from the start instant's TZID.
    let zone = resolver.zone(event.start.tzid())?;

    let uid = identity(event, resolver, &zone)?;

    let (all_day, start_dt) = normalize(&event.start, resolver, &zone)?;

    let end_dt = match (&event.end, event.duration) {
        (Some(end), _) => normalize(end, resolver, &zone)?.1,
        (None, Some(duration)) => start_dt + duration,
        (None, None) => {
            start_dt + if all_day { Duration::days(1) } else { Duration::hours(1) }
        }
    };

    let start = to_event_date_time(all_day, &start_dt, &zone);
    // The end always mirrors the start's all-day status, whatever produced it.
    let end = to_event_date_time(all_day, &end_dt, &zone);

    let rrule = event.rrule.as_deref().map(|raw| encode_rule(&parse_rule(raw)));

    let exdates = normalize_list(&event.exdates, resolver, &zone)?;
    let rdates = normalize_list(&event.rdates, resolver, &zone)?;

    // Recurrence lines belong to masters only: an override represents a
    // single materialized occurrence. RRULE precedes EXDATE precedes RDATE.
    let recurrence = if event.recurrence_id.is_none() {
        let mut lines = Vec::new();
        if let Some(ref rule) = rrule {
            lines.push(format!("RRULE:{rule}"));
        }
        if !exdates.is_empty() {
            lines.push(encode_dates(DateListKind::Exception, all_day, &exdates, &zone.id));
        }
        if !rdates.is_empty() {
            lines.push(encode_dates(DateListKind::Added, all_day, &rdates, &zone.id));
        }
        (!lines.is_empty()).then_some(lines)
    } else {
        None
    };

    let fp = fingerprint(&FingerprintPayload {
        summary: &event.summary,
        description: &event.description,
        location: &event.location,
        start: &start,
        end: &end,
        rrule: rrule.as_deref().unwrap_or(""),
        exdates: &date_list_text(all_day, &exdates),
        rdates: &date_list_text(all_day, &rdates),
    });

    let resource = EventResource {
        summary: event.summary.clone(),
        description: event.description.clone(),
        location: event.location.clone(),
        start,
        end,
        recurrence,
        extended_properties: ExtendedProperties {
            private: SyncAnnotation {
                src: SOURCE_TAG.to_string(),
                uid: uid.clone(),
                fp,
            },
        },
    };

    Ok((uid, resource))
}

/// `uid` for a master, `uid::<instant>` for an override.
///
/// The override instant is normalized into the event's working zone before
/// formatting, so the same override keys identically however the feed
/// spells it.
fn identity(event: &FeedEvent, resolver: &TzResolver, zone: &EventZone) -> IcsyncResult<String> {
    match &event.recurrence_id {
        None => Ok(event.uid.clone()),
        Some(instant) => {
            let (_, dt) = normalize(instant, resolver, zone)?;
            Ok(format!("{}::{}", event.uid, dt.to_rfc3339()))
        }
    }
}

fn to_event_date_time(all_day: bool, dt: &DateTime<Tz>, zone: &EventZone) -> EventDateTime {
    if all_day {
        EventDateTime::Date { date: dt.date_naive() }
    } else {
        EventDateTime::DateTime {
            date_time: dt.to_rfc3339(),
            time_zone: zone.id.clone(),
        }
    }
}

fn normalize_list(
    times: &[FeedTime],
    resolver: &TzResolver,
    zone: &EventZone,
) -> IcsyncResult<Vec<DateTime<Tz>>> {
    times
        .iter()
        .map(|t| normalize(t, resolver, zone).map(|(_, dt)| dt))
        .collect()
}

/// Exception/added-date lists as they enter the fingerprint: ordered
/// ISO text, dates for all-day events.
fn date_list_text(all_day: bool, instants: &[DateTime<Tz>]) -> Vec<String> {
    instants
        .iter()
        .map(|dt| {
            if all_day {
                dt.date_naive().to_string()
            } else {
                dt.to_rfc3339()
            }
        })
        .collect()
}

/// Observable content, in a fixed field order.
#[derive(Serialize)]
struct FingerprintPayload<'a> {
    summary: &'a str,
    description: &'a str,
    location: &'a str,
    start: &'a EventDateTime,
    end: &'a EventDateTime,
    rrule: &'a str,
    exdates: &'a [String],
    rdates: &'a [String],
}

/// md5 hex digest of the canonical payload serialization.
///
/// Change detection only, never identity.
fn fingerprint(payload: &FingerprintPayload) -> String {
    let json =
        serde_json::to_string(payload).expect("fingerprint payload is always serializable");
    crate::state::md5_hex(json.as_bytes())
}

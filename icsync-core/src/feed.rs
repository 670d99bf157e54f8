//! ICS feed parsing using the icalendar crate's parser.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{IcsyncError, IcsyncResult};

/// A feed-native instant, before normalization.
///
/// All-day detection is structural: only a `Date` counts, a midnight
/// time-of-day never does.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedTime {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
    Zoned { datetime: NaiveDateTime, tzid: String },
}

impl FeedTime {
    /// TZID parameter carried by this instant, if any.
    pub fn tzid(&self) -> Option<&str> {
        match self {
            FeedTime::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }
}

/// One VEVENT as read from the feed document.
#[derive(Debug, Clone)]
pub struct FeedEvent {
    pub uid: String,
    /// RECURRENCE-ID instant for an override of one series occurrence.
    pub recurrence_id: Option<FeedTime>,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: FeedTime,
    pub end: Option<FeedTime>,
    pub duration: Option<Duration>,
    /// Raw RRULE value text, e.g. `FREQ=WEEKLY;BYDAY=MO`.
    pub rrule: Option<String>,
    pub exdates: Vec<FeedTime>,
    pub rdates: Vec<FeedTime>,
}

impl FeedEvent {
    /// A master is the series-defining record: it carries the RRULE and is
    /// not an override of a single occurrence.
    pub fn is_master(&self) -> bool {
        self.rrule.is_some() && self.recurrence_id.is_none()
    }
}

/// Parse a feed document into its VEVENT records.
///
/// Events without a DTSTART are skipped; a document that does not parse at
/// all is fatal.
pub fn parse_feed(content: &str) -> IcsyncResult<Vec<FeedEvent>> {
    let unfolded = unfold(content);
    let calendar =
        read_calendar(&unfolded).map_err(|e| IcsyncError::FeedParse(e.to_string()))?;

    Ok(calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(parse_vevent)
        .collect())
}

fn parse_vevent(vevent: &Component) -> Option<FeedEvent> {
    let uid = vevent.find_prop("UID")?.val.to_string();
    let start = to_feed_time(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?);

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_feed_time);

    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));

    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_feed_time);

    Some(FeedEvent {
        uid,
        recurrence_id,
        summary: text_prop(vevent, "SUMMARY"),
        description: text_prop(vevent, "DESCRIPTION"),
        location: text_prop(vevent, "LOCATION"),
        start,
        end,
        duration,
        rrule,
        exdates: collect_date_list(vevent, "EXDATE"),
        rdates: collect_date_list(vevent, "RDATE"),
    })
}

fn text_prop(vevent: &Component, name: &str) -> String {
    vevent
        .find_prop(name)
        .map(|p| p.val.to_string())
        .unwrap_or_default()
}

/// Convert icalendar's DatePerhapsTime to our FeedTime, preserving timezone info
fn to_feed_time(dpt: DatePerhapsTime) -> FeedTime {
    match dpt {
        DatePerhapsTime::Date(d) => FeedTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => FeedTime::Utc(dt),
            icalendar::CalendarDateTime::Floating(naive) => FeedTime::Floating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => FeedTime::Zoned {
                datetime: date_time,
                tzid,
            },
        },
    }
}

/// Flatten every property named `name` into one ordered list.
///
/// EXDATE/RDATE may appear as repeated properties and as comma-separated
/// component lists, each property with its own TZID or VALUE=DATE parameter.
fn collect_date_list(vevent: &Component, name: &str) -> Vec<FeedTime> {
    vevent
        .properties
        .iter()
        .filter(|p| p.name == name)
        .flat_map(parse_date_list_property)
        .collect()
}

/// Parse one EXDATE/RDATE property into its FeedTime components.
///
/// Handles:
/// - TZID parameter: `EXDATE;TZID=America/New_York:20240108T100000`
/// - VALUE=DATE: `EXDATE;VALUE=DATE:20240108`
/// - UTC: `EXDATE:20240108T100000Z`
/// - Floating: `EXDATE:20240108T100000`
/// - Comma-separated values: `EXDATE;TZID=...:20240108T100000,20240115T100000`
fn parse_date_list_property(prop: &Property) -> Vec<FeedTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date {
                NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(FeedTime::Date)
            } else if let Some(ref tz) = tzid {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| FeedTime::Zoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(stripped) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| FeedTime::Utc(dt.and_utc()))
            } else {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(FeedTime::Floating)
            }
        })
        .collect()
}

/// Parse an ISO 8601 duration value (PT1H30M, P1D, ...).
fn parse_duration(value: &str) -> Option<Duration> {
    let negative = value.starts_with('-');
    let body = value.trim_start_matches(['-', '+']);

    let parsed = iso8601::duration(body).ok()?;
    let std_duration: std::time::Duration = parsed.into();
    let duration = Duration::from_std(std_duration).ok()?;

    Some(if negative { -duration } else { duration })
}

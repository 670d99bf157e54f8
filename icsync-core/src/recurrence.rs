//! Recurrence-line encoding for the target calendar.
//!
//! The feed's RRULE text is re-parsed and re-encoded in a canonical form so
//! that key order and casing differences between feed publishes never change
//! the output. Fingerprint stability across runs depends on this.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

/// Which recurrence date list a line encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateListKind {
    /// EXDATE — occurrences removed from the series.
    Exception,
    /// RDATE — occurrences added to the series.
    Added,
}

impl DateListKind {
    fn name(self) -> &'static str {
        match self {
            DateListKind::Exception => "EXDATE",
            DateListKind::Added => "RDATE",
        }
    }
}

/// Split a raw RRULE value into upper-cased key / value-list pairs.
pub fn parse_rule(text: &str) -> Vec<(String, Vec<String>)> {
    text.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (key, values) = part.split_once('=').unwrap_or((part, ""));
            (
                key.trim().to_ascii_uppercase(),
                values.split(',').map(|v| v.trim().to_string()).collect(),
            )
        })
        .collect()
}

/// Encode rule pairs as canonical RRULE text.
///
/// Keys are sorted case-insensitively, values joined with commas. UNTIL
/// becomes a compact UTC timestamp, COUNT a plain integer, and every other
/// value is upper-cased.
pub fn encode_rule(pairs: &[(String, Vec<String>)]) -> String {
    let mut sorted: Vec<(String, &[String])> = pairs
        .iter()
        .map(|(key, values)| (key.to_ascii_uppercase(), values.as_slice()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    sorted
        .iter()
        .map(|(key, values)| {
            let encoded: Vec<String> = values
                .iter()
                .map(|v| match key.as_str() {
                    "UNTIL" => encode_until(v),
                    "COUNT" => v
                        .trim()
                        .parse::<i64>()
                        .map(|n| n.to_string())
                        .unwrap_or_else(|_| v.trim().to_string()),
                    _ => v.to_ascii_uppercase(),
                })
                .collect();
            format!("{}={}", key, encoded.join(","))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// UNTIL is always an absolute UTC compact timestamp, whether the feed
/// published a date, a local datetime or a UTC datetime.
fn encode_until(value: &str) -> String {
    let v = value.trim();

    // A bare date is treated as midnight UTC.
    if let Ok(date) = NaiveDate::parse_from_str(v, "%Y%m%d") {
        return format!("{}T000000Z", date.format("%Y%m%d"));
    }

    // A naive datetime is taken as UTC; an explicit Z round-trips.
    if let Ok(dt) = NaiveDateTime::parse_from_str(v.trim_end_matches(['Z', 'z']), "%Y%m%dT%H%M%S") {
        return format!("{}Z", dt.format("%Y%m%dT%H%M%S"));
    }

    v.to_ascii_uppercase()
}

/// Encode an EXDATE/RDATE line from instants pre-normalized into the event
/// zone.
///
/// All-day events render `KIND;VALUE=DATE:yyyymmdd[,...]`; timed events
/// render local wall-clock values with the zone carried in the TZID
/// parameter: `KIND;TZID=<zone>:yyyymmddThhmmss[,...]`.
pub fn encode_dates(
    kind: DateListKind,
    is_all_day: bool,
    instants: &[DateTime<Tz>],
    zone_id: &str,
) -> String {
    if is_all_day {
        let values: Vec<String> = instants
            .iter()
            .map(|dt| dt.format("%Y%m%d").to_string())
            .collect();
        format!("{};VALUE=DATE:{}", kind.name(), values.join(","))
    } else {
        let values: Vec<String> = instants
            .iter()
            .map(|dt| dt.format("%Y%m%dT%H%M%S").to_string())
            .collect();
        format!("{};TZID={}:{}", kind.name(), zone_id, values.join(","))
    }
}

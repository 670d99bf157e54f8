//! Feed instant normalization.
//!
//! Converts a feed-native instant into an (is-all-day, zoned instant) pair
//! expressed in the event's working zone.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::IcsyncResult;
use crate::feed::FeedTime;
use crate::timezone::{EventZone, TzResolver};

/// Normalize a feed instant into the target zone.
///
/// - a date yields `(true, local midnight in the target zone)`;
/// - a floating time is taken to be wall-clock time in the target zone;
/// - a zoned time is resolved in its own (resolved) zone, then converted;
/// - a UTC time is converted directly.
pub fn normalize(
    value: &FeedTime,
    resolver: &TzResolver,
    target: &EventZone,
) -> IcsyncResult<(bool, DateTime<Tz>)> {
    match value {
        FeedTime::Date(d) => Ok((true, local_midnight(*d, target.tz))),
        FeedTime::Utc(dt) => Ok((false, dt.with_timezone(&target.tz))),
        FeedTime::Floating(naive) => Ok((false, localize(*naive, target.tz))),
        FeedTime::Zoned { datetime, tzid } => {
            let source = resolver.zone(Some(tzid))?;
            Ok((false, localize(*datetime, source.tz).with_timezone(&target.tz)))
        }
    }
}

/// Midnight at the start of `date` in `tz`.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .expect("00:00:00 is always a valid time");
    localize(midnight, tz)
}

/// Resolve a naive wall-clock time in `tz`.
///
/// DST folds take the earlier instant; a time inside a spring-forward gap
/// shifts to the first valid wall clock after it.
fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            let mut probe = naive;
            loop {
                probe = probe + Duration::minutes(30);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    break dt;
                }
            }
        }
    }
}

//! Feed timezone resolution.
//!
//! Outlook-published feeds name zones with vendor identifiers ("Romance
//! Standard Time") rather than IANA ids. A fixed alias table maps the known
//! vendor names; anything else passes through unchanged and is assumed to
//! already be canonical.

use std::collections::HashMap;

use chrono_tz::Tz;

use crate::error::{IcsyncError, IcsyncResult};

/// Vendor timezone aliases shipped by default (Windows display names).
pub fn windows_aliases() -> HashMap<String, String> {
    [
        ("Romance Standard Time", "Europe/Paris"),
        ("W. Europe Standard Time", "Europe/Berlin"),
        ("Central European Standard Time", "Europe/Warsaw"),
        ("FLE Standard Time", "Europe/Helsinki"),
    ]
    .into_iter()
    .map(|(name, iana)| (name.to_string(), iana.to_string()))
    .collect()
}

/// What to do with a canonical-looking id the zone database rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownZonePolicy {
    /// Fall back to the default zone; the offending id stays visible in a
    /// warning trace.
    Lenient,
    /// Fail the run.
    Strict,
}

/// A resolved working zone for one event: canonical id plus zone rules.
#[derive(Debug, Clone)]
pub struct EventZone {
    pub id: String,
    pub tz: Tz,
}

/// Maps feed-supplied TZID values to usable zones.
///
/// The alias table is injected rather than hardwired so feeds from other
/// vendors can bring their own names.
#[derive(Debug, Clone)]
pub struct TzResolver {
    aliases: HashMap<String, String>,
    default_id: String,
    default_tz: Tz,
    policy: UnknownZonePolicy,
}

impl TzResolver {
    pub fn new(
        default_zone: &str,
        aliases: HashMap<String, String>,
        policy: UnknownZonePolicy,
    ) -> IcsyncResult<TzResolver> {
        let default_tz = default_zone
            .parse::<Tz>()
            .map_err(|_| IcsyncError::Config(format!("Invalid default timezone: {default_zone}")))?;

        Ok(TzResolver {
            aliases,
            default_id: default_zone.to_string(),
            default_tz,
            policy,
        })
    }

    pub fn default_zone(&self) -> EventZone {
        EventZone {
            id: self.default_id.clone(),
            tz: self.default_tz,
        }
    }

    /// Map a feed TZID to a canonical zone id.
    ///
    /// Total: empty/absent input yields the default zone, unknown names pass
    /// through unchanged.
    pub fn resolve(&self, tzid: Option<&str>) -> String {
        match tzid {
            None | Some("") => self.default_id.clone(),
            Some(raw) => self
                .aliases
                .get(raw)
                .cloned()
                .unwrap_or_else(|| raw.to_string()),
        }
    }

    /// Resolve a TZID and look up its zone rules.
    pub fn zone(&self, tzid: Option<&str>) -> IcsyncResult<EventZone> {
        let id = self.resolve(tzid);
        match id.parse::<Tz>() {
            Ok(tz) => Ok(EventZone { id, tz }),
            Err(_) => match self.policy {
                UnknownZonePolicy::Strict => Err(IcsyncError::Timezone(id)),
                UnknownZonePolicy::Lenient => {
                    eprintln!("warning: unknown timezone '{}', using {}", id, self.default_id);
                    Ok(self.default_zone())
                }
            },
        }
    }
}

//! Runtime configuration.
//!
//! Environment-style key/value settings, read once at startup into an
//! explicit value that is passed by reference into each component.

use std::path::PathBuf;

use crate::error::{IcsyncError, IcsyncResult};

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";
pub const DEFAULT_PAST_DAYS: i64 = 30;
pub const DEFAULT_STATE_FILE: &str = ".state.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Published feed to mirror.
    pub ics_url: String,
    /// Calendar the feed is mirrored into.
    pub target_calendar_id: String,
    /// Path to the Google credential file.
    pub credentials_path: PathBuf,
    /// Default zone for naive and date-only feed instants.
    pub timezone: String,
    /// Retention window in days for non-recurring past events.
    pub past_days: i64,
    /// Sync-state location.
    pub state_file: PathBuf,
    /// Fail on unknown timezone ids instead of falling back.
    pub strict_timezones: bool,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// Missing required keys and unparseable values are fatal.
    pub fn from_env() -> IcsyncResult<Config> {
        Ok(Config {
            ics_url: required("ICS_URL")?,
            target_calendar_id: required("TARGET_CALENDAR_ID")?,
            credentials_path: PathBuf::from(required("GOOGLE_APPLICATION_CREDENTIALS")?),
            timezone: optional("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            past_days: integer("PAST_DAYS", DEFAULT_PAST_DAYS)?,
            state_file: optional("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            strict_timezones: flag("TZ_STRICT"),
        })
    }
}

fn required(key: &str) -> IcsyncResult<String> {
    optional(key).ok_or_else(|| IcsyncError::Config(format!("{key} must be set")))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn integer(key: &str, default: i64) -> IcsyncResult<i64> {
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| IcsyncError::Config(format!("{key} must be an integer, got '{raw}'"))),
    }
}

fn flag(key: &str) -> bool {
    matches!(optional(key).as_deref(), Some("1") | Some("true") | Some("yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // One combined test: env vars are process-global and tests run in
    // parallel threads.
    #[test]
    fn test_from_env_defaults_and_required_keys() {
        unsafe {
            std::env::remove_var("ICS_URL");
            std::env::remove_var("TARGET_CALENDAR_ID");
            std::env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");
        }
        assert!(Config::from_env().is_err(), "required keys must be enforced");

        unsafe {
            std::env::set_var("ICS_URL", "https://example.com/feed.ics");
            std::env::set_var("TARGET_CALENDAR_ID", "primary");
            std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/creds.json");
        }
        let config = Config::from_env().unwrap();

        assert_eq!(config.timezone, DEFAULT_TIMEZONE);
        assert_eq!(config.past_days, DEFAULT_PAST_DAYS);
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
        assert!(!config.strict_timezones);
    }
}

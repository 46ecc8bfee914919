//! Middleware configuration.
//!
//! [`LoggerConfig`] is built once at application setup and never changes
//! afterwards. It deserializes with serde so it can sit inside a host's own
//! configuration file:
//!
//! ```toml
//! [access_log]
//! utc = true
//! time_format = "%Y-%m-%d %H:%M:%S"
//! verbosity = 1
//! skip_paths = ["/healthz", "/readyz"]
//! ```

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, TimeZone};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Configuration captured by [`RequestLogger`](crate::RequestLogger) at
/// construction time.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Convert the completion timestamp to UTC before formatting it.
    pub utc: bool,
    /// Layout of the `time` field.
    pub time_format: TimeFormat,
    /// Verbosity handed to [`LogSink::info`](crate::LogSink::info).
    pub verbosity: u8,
    /// Exact-match request paths that are never logged.
    pub skip_paths: Vec<String>,
}

impl LoggerConfig {
    pub fn utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    pub fn time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Adds one path to the skip list. Returns `self` for chaining.
    pub fn skip(mut self, path: impl Into<String>) -> Self {
        self.skip_paths.push(path.into());
        self
    }
}

// ── TimeFormat ────────────────────────────────────────────────────────────────

/// How the `time` field of a log record is rendered.
///
/// A `TimeFormat` is always renderable: custom patterns are checked when they
/// are parsed, so nothing can fail on the request path.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct TimeFormat(Layout);

#[derive(Clone, Debug, PartialEq, Eq)]
enum Layout {
    Rfc3339,
    Strftime(String),
}

impl TimeFormat {
    /// `2006-01-02T15:04:05+07:00`, with `Z` for UTC. The default.
    pub fn rfc3339() -> Self {
        Self(Layout::Rfc3339)
    }

    /// A chrono `strftime` pattern such as `%Y-%m-%d %H:%M:%S%.3f`.
    pub fn strftime(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidTimeFormat(pattern));
        }
        Ok(Self(Layout::Strftime(pattern)))
    }

    pub fn render<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match &self.0 {
            Layout::Rfc3339 => at.to_rfc3339_opts(SecondsFormat::Secs, true),
            Layout::Strftime(pattern) => {
                let mut out = String::new();
                match write!(out, "{}", at.format(pattern)) {
                    Ok(()) => out,
                    // never a half-written timestamp
                    Err(_) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
                }
            }
        }
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self::rfc3339()
    }
}

impl FromStr for TimeFormat {
    type Err = Error;

    /// `"rfc3339"` in any case selects [`TimeFormat::rfc3339`]; anything else
    /// is treated as a `strftime` pattern.
    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("rfc3339") {
            Ok(Self::rfc3339())
        } else {
            Self::strftime(s)
        }
    }
}

impl TryFrom<String> for TimeFormat {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn defaults() {
        let config = LoggerConfig::default();
        assert!(!config.utc);
        assert_eq!(config.time_format, TimeFormat::rfc3339());
        assert_eq!(config.verbosity, 0);
        assert!(config.skip_paths.is_empty());
    }

    #[test]
    fn rfc3339_uses_z_for_utc() {
        assert_eq!(TimeFormat::rfc3339().render(&instant()), "2024-03-09T14:05:07Z");
    }

    #[test]
    fn rfc3339_keeps_local_offset() {
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        let rendered = TimeFormat::rfc3339().render(&instant().with_timezone(&east));
        assert_eq!(rendered, "2024-03-09T16:05:07+02:00");
    }

    #[test]
    fn strftime_pattern() {
        let format = TimeFormat::strftime("%d/%m/%Y %H:%M").unwrap();
        assert_eq!(format.render(&instant()), "09/03/2024 14:05");
    }

    #[test]
    fn strftime_renders_every_item() {
        let format = TimeFormat::strftime("%Y-%m-%d %H:%M:%S%.3f %:z [%A]").unwrap();
        let east = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            format.render(&instant().with_timezone(&east)),
            "2024-03-09 15:05:07.000 +01:00 [Saturday]"
        );
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = TimeFormat::strftime("%Y-%Q").unwrap_err();
        assert!(matches!(err, Error::InvalidTimeFormat(p) if p == "%Y-%Q"));
    }

    #[test]
    fn parse_keyword_is_case_insensitive() {
        assert_eq!("RFC3339".parse::<TimeFormat>().unwrap(), TimeFormat::rfc3339());
        assert_eq!("rfc3339".parse::<TimeFormat>().unwrap(), TimeFormat::rfc3339());
    }

    #[test]
    fn builder_chain() {
        let config = LoggerConfig::default()
            .utc(true)
            .verbosity(2)
            .skip("/healthz")
            .skip("/readyz");
        assert!(config.utc);
        assert_eq!(config.verbosity, 2);
        assert_eq!(config.skip_paths, ["/healthz", "/readyz"]);
    }
}

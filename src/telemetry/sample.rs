//! # Telemetry Sample
//!
//! One starter's latest fix, and its rendering as a log line.
//!
//! ## Line format
//!
//! ```text
//! <timestamp>, <speed>, (<lat>, <lng>), <battery>, <online>
//! ```
//!
//! - Missing optional values are written as `None`.
//! - Booleans are written as `True` / `False`.
//! - Numbers are written exactly as the tracker sent them (`87`, `12.3`).
//! - Timestamps are ISO-8601 with an explicit offset. Microseconds are only
//!   written when nonzero.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Number;
use std::fmt;

/// Literal written for a value the tracker did not report
pub const NONE_LITERAL: &str = "None";

/// Validated telemetry for one starter
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub timestamp: DateTime<FixedOffset>,
    pub speed: Option<Number>,
    pub lat: Number,
    pub lng: Number,
    pub battery: Option<Number>,
    pub online: Option<bool>,
}

impl TelemetrySample {
    /// Render the sample as a log line, without the trailing newline
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::DateTime;
    /// use racemap_logger::telemetry::sample::TelemetrySample;
    ///
    /// let sample = TelemetrySample {
    ///     timestamp: DateTime::parse_from_rfc3339("2024-09-01T10:00:00+01:00").unwrap(),
    ///     speed: None,
    ///     lat: serde_json::Number::from_f64(48.1).unwrap(),
    ///     lng: serde_json::Number::from_f64(11.5).unwrap(),
    ///     battery: Some(87.into()),
    ///     online: Some(false),
    /// };
    /// assert_eq!(
    ///     sample.to_log_line(),
    ///     "2024-09-01T10:00:00+01:00, None, (48.1, 11.5), 87, False"
    /// );
    /// ```
    pub fn to_log_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, ({}, {}), {}, {}",
            format_timestamp(&self.timestamp),
            render_optional(self.speed.as_ref()),
            self.lat,
            self.lng,
            render_optional(self.battery.as_ref()),
            render_optional(self.online.map(render_bool)),
        )
    }
}

fn render_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn render_optional<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| NONE_LITERAL.to_string(), |v| v.to_string())
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS[.ffffff]+HH:MM`
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    let micros = ts.timestamp_subsec_micros();
    if micros == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        format!(
            "{}.{:06}{}",
            ts.format("%Y-%m-%dT%H:%M:%S"),
            micros,
            ts.format("%:z")
        )
    }
}

/// Offset-bearing layouts tried after RFC 3339
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
];

/// Layouts without an offset, read as local time in the zulu offset
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a tracker timestamp
///
/// A trailing `Z` is replaced by `zulu_offset` before parsing. Timestamps
/// without any offset are read as local time in `zulu_offset` as well.
/// Seconds and the colon inside the offset are optional.
///
/// Returns `None` if the string is not an ISO-8601 date or date-time.
pub fn parse_timestamp(raw: &str, zulu_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let substituted = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(stripped) => format!("{}{}", stripped, zulu_offset),
        None => raw.to_string(),
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&substituted) {
        return Some(ts);
    }

    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&substituted, fmt).ok())
    {
        return Some(ts);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&substituted, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&substituted, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    zulu_offset.from_local_datetime(&naive).single()
}

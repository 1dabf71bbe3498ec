//! Timestamp normalization.
//!
//! Sources disagree wildly on how they write time: Trillian uses `ctime`
//! style stamps, SMS dumps mix several locale formats within one corpus,
//! Skype uses RFC 3339, Telegram and Skypelog use epoch numbers in two
//! different scales. [`TimestampNormalizer`] maps each source family
//! ([`FormatHint`]) to an ordered list of [`TimestampPattern`]s and returns
//! the first successful parse, truncated to whole seconds in UTC.
//!
//! # Example
//!
//! ```
//! use chatarchive::parsing::timestamp::{FormatHint, TimestampNormalizer};
//!
//! let normalizer = TimestampNormalizer::default();
//! let ts = normalizer.normalize("Thu Jan 24 21:54:39 2002", FormatHint::Trillian)?;
//! assert_eq!(ts.to_rfc3339(), "2002-01-24T21:54:39+00:00");
//!
//! // Millisecond and second epochs land on the same instant.
//! let ms = normalizer.normalize("1700000000000", FormatHint::Epoch)?;
//! let s = normalizer.normalize("1700000000", FormatHint::Epoch)?;
//! assert_eq!(ms, s);
//! # Ok::<(), chatarchive::ArchiveError>(())
//! ```

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// Epoch values above this are taken to be milliseconds.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Pattern family selecting which formats to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatHint {
    /// `Thu Jan 24 21:54:39 2002`
    Trillian,
    /// Mixed SMS export formats (`29.12.2003 г. 21:40:05`, `03/01/09 18:13:51`, ...)
    Sms,
    /// `2009-11-20 20:9:48`, composed from Kopete log headers
    Kopete,
    /// RFC 3339 and offset-less ISO 8601
    Iso8601,
    /// `1 March 2000 at 09:33:50 UTC`
    GoogleChat,
    /// Unix epoch in seconds or milliseconds
    Epoch,
}

impl FormatHint {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatHint::Trillian => "trillian",
            FormatHint::Sms => "sms",
            FormatHint::Kopete => "kopete",
            FormatHint::Iso8601 => "iso8601",
            FormatHint::GoogleChat => "google-chat",
            FormatHint::Epoch => "epoch",
        }
    }

    pub fn all() -> &'static [FormatHint] {
        &[
            FormatHint::Trillian,
            FormatHint::Sms,
            FormatHint::Kopete,
            FormatHint::Iso8601,
            FormatHint::GoogleChat,
            FormatHint::Epoch,
        ]
    }
}

impl fmt::Display for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of reading a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampPattern {
    /// chrono format without offset; the value is taken as UTC
    Naive(String),
    /// chrono format with a date only; midnight UTC
    DateOnly(String),
    /// chrono format that includes an offset (`%z`)
    Offset(String),
    /// RFC 3339 with any offset
    Rfc3339,
    /// Unix epoch, seconds or milliseconds
    Epoch,
}

impl TimestampPattern {
    pub fn naive(fmt: &str) -> Self {
        TimestampPattern::Naive(fmt.to_string())
    }

    pub fn date_only(fmt: &str) -> Self {
        TimestampPattern::DateOnly(fmt.to_string())
    }

    pub fn offset(fmt: &str) -> Self {
        TimestampPattern::Offset(fmt.to_string())
    }

    /// Attempts to read `raw` with this pattern.
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let parsed = match self {
            TimestampPattern::Naive(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
                .ok()
                .map(|naive| naive.and_utc()),
            TimestampPattern::DateOnly(fmt) => NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc()),
            TimestampPattern::Offset(fmt) => DateTime::parse_from_str(raw, fmt)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimestampPattern::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimestampPattern::Epoch => parse_epoch(raw),
        };
        parsed.map(|ts| ts.trunc_subsecs(0))
    }

    /// Renders `ts` the way this pattern reads it.
    pub fn format(&self, ts: &DateTime<Utc>) -> String {
        match self {
            TimestampPattern::Naive(fmt)
            | TimestampPattern::DateOnly(fmt)
            | TimestampPattern::Offset(fmt) => ts.format(fmt).to_string(),
            TimestampPattern::Rfc3339 => ts.to_rfc3339(),
            TimestampPattern::Epoch => ts.timestamp().to_string(),
        }
    }

    /// Returns `true` when the pattern carries no time of day.
    pub fn is_date_only(&self) -> bool {
        matches!(self, TimestampPattern::DateOnly(_))
    }
}

/// Converts an epoch number, applying the millisecond heuristic.
pub fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    let secs = if value > EPOCH_MILLIS_THRESHOLD {
        value / 1000
    } else {
        value
    };
    DateTime::from_timestamp(secs, 0)
}

fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(value) = raw.parse::<i64>() {
        return from_epoch(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    from_epoch(value.trunc() as i64)
}

/// Parses source timestamps into UTC instants.
///
/// The pattern table is fixed at construction; clone and override with
/// [`with_patterns`](Self::with_patterns) to customize.
#[derive(Debug, Clone)]
pub struct TimestampNormalizer {
    patterns: HashMap<FormatHint, Vec<TimestampPattern>>,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        let mut patterns = HashMap::new();
        patterns.insert(
            FormatHint::Trillian,
            vec![TimestampPattern::naive("%a %b %d %H:%M:%S %Y")],
        );
        // Order matters: the first pattern that parses wins.
        patterns.insert(
            FormatHint::Sms,
            vec![
                TimestampPattern::naive("%d.%m.%Y г. %H:%M:%S"),
                TimestampPattern::naive("%d.%m.%Y г. %H:%M"),
                TimestampPattern::naive("%d.%m.%y 'г.' %H:%M"),
                TimestampPattern::naive("%m/%d/%y %H:%M:%S"),
                TimestampPattern::naive("%y.%m.%d 'y.' %H:%M"),
                TimestampPattern::naive("%d.%m.%Y %H:%M:%S"),
                TimestampPattern::naive("%d %m %Y %H %M %S"),
                TimestampPattern::naive("%Y-%m-%d %H:%M:%S"),
                TimestampPattern::naive("%d/%m/%Y %H:%M:%S"),
                TimestampPattern::date_only("%d.%m.%y"),
            ],
        );
        patterns.insert(
            FormatHint::Kopete,
            vec![TimestampPattern::naive("%Y-%m-%d %H:%M:%S")],
        );
        patterns.insert(
            FormatHint::Iso8601,
            vec![
                TimestampPattern::Rfc3339,
                TimestampPattern::naive("%Y-%m-%dT%H:%M:%S%.f"),
                TimestampPattern::naive("%Y-%m-%dT%H:%M"),
            ],
        );
        patterns.insert(
            FormatHint::GoogleChat,
            vec![TimestampPattern::naive("%d %B %Y at %H:%M:%S UTC")],
        );
        patterns.insert(FormatHint::Epoch, vec![TimestampPattern::Epoch]);
        Self { patterns }
    }
}

impl TimestampNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the pattern list for one hint.
    #[must_use]
    pub fn with_patterns(mut self, hint: FormatHint, patterns: Vec<TimestampPattern>) -> Self {
        self.patterns.insert(hint, patterns);
        self
    }

    /// Returns the ordered patterns registered for `hint`.
    pub fn patterns(&self, hint: FormatHint) -> &[TimestampPattern] {
        self.patterns.get(&hint).map_or(&[], Vec::as_slice)
    }

    /// Parses `raw` with the patterns registered for `hint`, first match wins.
    ///
    /// Runs of whitespace are collapsed first, so space-padded days
    /// (`Feb  1`) match single-space formats.
    pub fn normalize(&self, raw: &str, hint: FormatHint) -> Result<DateTime<Utc>> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        self.patterns(hint)
            .iter()
            .find_map(|pattern| pattern.parse(&collapsed))
            .ok_or_else(|| ArchiveError::timestamp(raw, hint))
    }

    /// Converts an epoch number taken directly from structured input.
    pub fn normalize_epoch(&self, value: i64) -> Result<DateTime<Utc>> {
        from_epoch(value).ok_or_else(|| ArchiveError::timestamp(value.to_string(), FormatHint::Epoch))
    }
}

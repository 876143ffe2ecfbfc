//! UTC instant canonicalization.
//!
//! Every timestamp the engine carries is normalised to a UTC, second-precision
//! `Instant` whose textual form is always `YYYY-MM-DDTHH:MM:SSZ` (spec §4.1,
//! §6.4). Parsing accepts RFC3339/ISO-8601 strings (with or without a `Z` or
//! explicit offset; naive strings are interpreted as UTC) and numeric epoch
//! seconds. Fractional seconds are truncated, not rounded.

use crate::core::error::Error;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// A UTC instant truncated to second precision.
///
/// Two instants compare equal iff their canonical second-precision
/// representations are equal; `Instant` never carries sub-second state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(DateTime<Utc>);

impl Instant {
    pub fn from_epoch_seconds(secs: i64) -> Self {
        Instant(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    pub fn now() -> Self {
        Instant(Utc::now().with_nanosecond_zero())
    }

    pub fn inner(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parses an instant from a JSON scalar: a string (RFC3339/ISO-8601,
    /// with optional trailing `Z`, explicit offset, or no offset at all) or
    /// a number (epoch seconds).
    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        match value {
            serde_json::Value::String(s) => Instant::from_str(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Instant::from_epoch_seconds(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Instant::from_epoch_seconds(f.trunc() as i64))
                } else {
                    Err(Error::BadTimestamp(format!(
                        "unsupported numeric timestamp: {n}"
                    )))
                }
            }
            other => Err(Error::BadTimestamp(format!(
                "unsupported timestamp type: {other}"
            ))),
        }
    }
}

trait WithNanosecondZero {
    fn with_nanosecond_zero(self) -> Self;
}

impl WithNanosecondZero for DateTime<Utc> {
    fn with_nanosecond_zero(self) -> Self {
        use chrono::Timelike;
        self.with_nanosecond(0).unwrap_or(self)
    }
}

impl FromStr for Instant {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::BadTimestamp("empty timestamp".to_string()));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Instant(dt.with_timezone(&Utc).with_nanosecond_zero()));
        }

        // Naive timestamp (no offset, no 'Z'): interpret as UTC.
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(Instant(
                    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).with_nanosecond_zero(),
                ));
            }
        }

        Err(Error::BadTimestamp(format!("unparsable timestamp: {raw}")))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl Serialize for Instant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Instant::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A fresh ULID-based identifier, used for audit event ids.
pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

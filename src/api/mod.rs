//! HTTP API module
//!
//! Translates JSON requests into calls on the log store and encodes the
//! results back. All input validation happens here; the store only ever sees
//! well-typed arguments.

pub mod server;

pub use server::{router, start, ApiError, ServerHandle};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Entry;

/// Datetime formats with an explicit UTC offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Datetime formats without an offset; these are read as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO 8601 timestamp
///
/// Accepts RFC 3339, datetimes without an offset (taken as UTC) and bare
/// dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as RFC 3339 in UTC
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A validated log submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    /// Service the message belongs to
    pub service: String,
    /// When the message was logged
    pub timestamp: DateTime<Utc>,
    /// Message body
    pub message: String,
}

impl TryFrom<Value> for NewLogEntry {
    type Error = ApiError;

    fn try_from(body: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = body else {
            return Err(ApiError::InvalidJson);
        };

        // Presence is checked for every field before any type checks
        for field in ["service", "timestamp", "message"] {
            if !fields.contains_key(field) {
                return Err(ApiError::MissingField(field));
            }
        }

        let (Some(Value::String(service)), Some(Value::String(message))) =
            (fields.remove("service"), fields.remove("message"))
        else {
            return Err(ApiError::NotStrings);
        };

        let timestamp = match fields.remove("timestamp") {
            Some(Value::String(raw)) => parse_timestamp(&raw),
            _ => None,
        }
        .ok_or(ApiError::InvalidTimestamp)?;

        if service.is_empty() {
            return Err(ApiError::EmptyService);
        }

        Ok(Self {
            service,
            timestamp,
            message,
        })
    }
}

/// Query string for range lookups
#[derive(Debug, Clone, Default)]
pub struct RangeParams {
    pub service: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl FromIterator<(String, String)> for RangeParams {
    /// Collect decoded query pairs; a repeated key keeps its last value and
    /// unknown keys are ignored
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "service" => params.service = Some(value),
                "start" => params.start = Some(value),
                "end" => params.end = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// A validated range lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub service: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TryFrom<RangeParams> for RangeQuery {
    type Error = ApiError;

    fn try_from(params: RangeParams) -> Result<Self, Self::Error> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let (Some(service), Some(start), Some(end)) = (
            non_empty(params.service),
            non_empty(params.start),
            non_empty(params.end),
        ) else {
            return Err(ApiError::MissingQueryParams);
        };

        let start = parse_timestamp(&start).ok_or(ApiError::InvalidTimestamp)?;
        let end = parse_timestamp(&end).ok_or(ApiError::InvalidTimestamp)?;

        if end < start {
            return Err(ApiError::InvertedRange);
        }

        Ok(Self {
            service,
            start,
            end,
        })
    }
}

/// A stored entry as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub message: String,
}

impl From<Entry> for LogRecord {
    fn from(entry: Entry) -> Self {
        Self {
            timestamp: format_timestamp(&entry.timestamp),
            message: entry.message,
        }
    }
}

/// Body of a successful range lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogRecord>,
}

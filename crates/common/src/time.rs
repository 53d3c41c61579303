//! Timestamp helpers. Every timestamp written to the data file goes through here.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current UTC time as an RFC 3339 / ISO-8601 string with microsecond precision.
pub fn now_iso() -> String {
    to_iso(Utc::now())
}

pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp previously produced by [`now_iso`].
pub fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}

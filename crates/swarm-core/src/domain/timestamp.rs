//! Lenient timestamp parsing for platform-assigned and publisher-supplied times.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (`2025-02-03T12:00:00Z`, `...+09:00`), offset-less date
/// times which are read as UTC (`2025-02-03T12:00:00.123456`), and bare dates
/// (midnight UTC). Anything else is `None`; callers decide what "unparsable"
/// means for them.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

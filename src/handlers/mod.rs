//! HTTP handlers plus the small header/time helpers they share.

pub mod article_handlers;
pub mod health_handlers;
pub mod object_handlers;

use chrono::{DateTime, Utc};

/// Format a timestamp the way HTTP headers expect it
/// (`Mon, 02 Jan 2006 15:04:05 GMT`).
pub(crate) fn http_time_string(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP-date, as produced by [`http_time_string`].
pub(crate) fn parse_http_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

//! Upload preconditions: disposition filename extraction, declared-size
//! bounds, and MIME sniffing for uploads that arrive without a type.
//!
//! The validator checks the declared headers only; the handler still bounds
//! the realized body independently via the router's body limit.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{GatewayError, GatewayResult};

/// Upper bound on a declared upload size: 1 MiB.
pub const FILE_LIMIT_BYTES: i64 = 2 << 19;

static DISPOSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="(?P<filename>[^"]*)""#).expect("valid regex"));

/// Validate the upload headers and return the target filename.
///
/// Rejected requests never reach the backend client.
pub fn validate(disposition: &str, content_length: &str) -> GatewayResult<String> {
    let filename = validate_disposition(disposition.trim())?;
    validate_size(content_length.trim())?;
    Ok(filename)
}

/// Pull the `filename="..."` token out of a disposition header.
pub fn parse_disposition(disposition: &str) -> Option<String> {
    DISPOSITION_RE
        .captures(disposition)
        .map(|caps| caps["filename"].to_string())
}

fn validate_disposition(disposition: &str) -> GatewayResult<String> {
    match parse_disposition(disposition) {
        Some(filename) if !filename.is_empty() => Ok(filename),
        _ => Err(GatewayError::InvalidDisposition(
            "invalid disposition, filename is empty".into(),
        )),
    }
}

fn validate_size(size: &str) -> GatewayResult<i64> {
    let parsed: i64 = size.parse().map_err(|_| {
        GatewayError::InvalidSize(format!("could not parse `{size}` as a byte count"))
    })?;
    if !(1..=FILE_LIMIT_BYTES).contains(&parsed) {
        return Err(GatewayError::InvalidSize(format!(
            "size must be between 1 and {FILE_LIMIT_BYTES}"
        )));
    }
    Ok(parsed)
}

/// Guess a content type from the leading bytes of an upload.
///
/// Used only when the caller sent an empty content-type header. Covers the
/// formats this gateway actually serves; everything unrecognized falls back
/// to `application/octet-stream`.
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.starts_with(b"%PDF-") {
        "application/pdf"
    } else if bytes.starts_with(b"PK\x03\x04") {
        "application/zip"
    } else if looks_like_html(bytes) {
        "text/html; charset=utf-8"
    } else if std::str::from_utf8(&bytes[..bytes.len().min(512)]).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(&bytes[..bytes.len().min(512)]) else {
        return false;
    };
    let head = text.trim_start().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

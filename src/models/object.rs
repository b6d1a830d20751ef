//! Objects as seen through the remote bucket.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One entry from a bucket listing.
///
/// Produced by `ListObjectsV2` and never persisted by the gateway; it is a
/// snapshot of what the remote store reported at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Size in bytes as reported by the store.
    pub size: i64,

    /// Timestamp when the object was last modified.
    pub last_modified: DateTime<Utc>,

    /// ETag as reported by the store.
    pub etag: String,
}

/// A fully materialized object, buffered for a single fetch.
///
/// Owned exclusively by the request that created it. Metadata fields are
/// optional because the remote store may omit them.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub content: Bytes,
}

/// Result of a conditional fetch.
///
/// "Not modified" is a normal outcome, not an error, so the boundary layer
/// can answer with a 304 without content.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Found(StoredObject),
    Unmodified,
}

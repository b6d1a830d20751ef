//! Backend client for the remote S3-compatible store, plus the pagination
//! accumulator that flattens multi-page listings.
//!
//! `ObjectBackend` is the seam between handlers and the wire: each method is
//! a single request/response with no internal state, and `list_all` drives
//! `list_page` until the continuation token runs out. The AWS client config
//! (endpoint, credentials, bucket) is built once at startup and never
//! mutated, so one `S3Backend` is shared by all requests.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{GatewayError, GatewayResult};
use crate::models::object::{FetchOutcome, ObjectSummary, StoredObject};

/// Shared state handed to every handler: the backend client, the root
/// prefix under which articles live, and the process start time as an
/// HTTP-date (reported by the liveness probe).
#[derive(Clone)]
pub struct GatewayState {
    pub backend: Arc<dyn ObjectBackend>,
    pub article_prefix: Arc<str>,
    pub started: Arc<str>,
}

/// Single-shot operations against the remote store.
///
/// Conditional parameters on `fetch` are forwarded verbatim; freshness is
/// decided by the store, never computed here.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Fetch one listing page. An absent `continuation_token` requests the
    /// first page; the returned token, when present, continues the listing.
    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> GatewayResult<(Vec<ObjectSummary>, Option<String>)>;

    /// Fetch a single object, optionally conditioned on an ETag or a
    /// modification time. A "not modified" answer from the store is a
    /// normal outcome, not an error.
    async fn fetch(
        &self,
        key: &str,
        if_none_match: Option<&str>,
        if_modified_since: Option<DateTime<Utc>>,
    ) -> GatewayResult<FetchOutcome>;

    /// Write an object under `directory`/`filename`, returning the ETag the
    /// store assigned, if any.
    async fn store(
        &self,
        directory: &str,
        filename: &str,
        bytes: Bytes,
        mime: &str,
    ) -> GatewayResult<Option<String>>;

    /// Delete an object. Removing a key that does not exist succeeds.
    async fn remove(&self, directory: &str, filename: &str) -> GatewayResult<()>;
}

/// Accumulate a full listing across continuation tokens.
///
/// An explicit loop rather than recursion: page calls are sequential by
/// nature (each depends on the previous token) and the page count is
/// unbounded. The first page error aborts the whole listing; partial
/// results are never returned.
pub async fn list_all<B: ObjectBackend + ?Sized>(
    backend: &B,
    prefix: Option<&str>,
) -> GatewayResult<Vec<ObjectSummary>> {
    let mut summaries = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let (page, next) = backend.list_page(prefix, token.as_deref()).await?;
        summaries.extend(page);
        match next {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!(count = summaries.len(), "accumulated listing");
    Ok(summaries)
}

/// Join a directory and filename into a bucket key with single separators.
///
/// Collapses duplicate `/` and trims empty segments; a leading separator on
/// the directory is preserved since deployed key namespaces may be rooted.
pub fn join_key(directory: &str, filename: &str) -> String {
    let rooted = directory.starts_with('/');
    let joined = directory
        .split('/')
        .chain(filename.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}

/// `ObjectBackend` implementation over the AWS SDK client.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> GatewayResult<(Vec<ObjectSummary>, Option<String>)> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);
        if let Some(prefix) = prefix {
            request = request.prefix(prefix);
        }
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let output = request
            .send()
            .await
            .map_err(|err| backend_error("ListObjectsV2", err))?;

        let page = output
            .contents()
            .iter()
            .map(|entry| ObjectSummary {
                key: entry.key().unwrap_or_default().to_string(),
                size: entry.size().unwrap_or(0),
                last_modified: entry.last_modified().map(to_chrono).unwrap_or_default(),
                etag: entry.e_tag().unwrap_or_default().to_string(),
            })
            .collect();

        let next = if output.is_truncated() == Some(true) {
            output.next_continuation_token().map(ToOwned::to_owned)
        } else {
            None
        };

        Ok((page, next))
    }

    async fn fetch(
        &self,
        key: &str,
        if_none_match: Option<&str>,
        if_modified_since: Option<DateTime<Utc>>,
    ) -> GatewayResult<FetchOutcome> {
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(etag) = if_none_match {
            request = request.if_none_match(etag);
        }
        if let Some(since) = if_modified_since {
            request = request.if_modified_since(AwsDateTime::from_secs(since.timestamp()));
        }

        let output = match request.send().await {
            Ok(output) => output,
            Err(err) => {
                if let SdkError::ServiceError(ref ctx) = err {
                    // Preconditions held: the store answered 304 instead of
                    // a body.
                    if ctx.raw().status().as_u16() == 304 {
                        return Ok(FetchOutcome::Unmodified);
                    }
                    if ctx.err().is_no_such_key() {
                        return Err(GatewayError::NotFound(key.to_string()));
                    }
                }
                return Err(backend_error("GetObject", err));
            }
        };

        let etag = output.e_tag().map(ToOwned::to_owned);
        let last_modified = output.last_modified().map(to_chrono);
        let content_type = output.content_type().map(ToOwned::to_owned);
        let content = output
            .body
            .collect()
            .await
            .map_err(|err| backend_error("GetObject body", err))?
            .into_bytes();

        Ok(FetchOutcome::Found(StoredObject {
            key: key.to_string(),
            etag,
            last_modified,
            content_type,
            content,
        }))
    }

    async fn store(
        &self,
        directory: &str,
        filename: &str,
        bytes: Bytes,
        mime: &str,
    ) -> GatewayResult<Option<String>> {
        let key = join_key(directory, filename);
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(mime)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| backend_error("PutObject", err))?;

        debug!(key = %key, "stored object");
        Ok(output.e_tag().map(ToOwned::to_owned))
    }

    async fn remove(&self, directory: &str, filename: &str) -> GatewayResult<()> {
        let key = join_key(directory, filename);
        // S3 DeleteObject succeeds on absent keys, which gives this call
        // its idempotency.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| backend_error("DeleteObject", err))?;

        debug!(key = %key, "removed object");
        Ok(())
    }
}

fn to_chrono(timestamp: &AwsDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos()).unwrap_or_default()
}

fn backend_error<E>(operation: &str, err: E) -> GatewayError
where
    E: std::error::Error + Send + Sync + 'static,
{
    GatewayError::BackendUnavailable(format!("{operation}: {}", DisplayErrorContext(&err)))
}

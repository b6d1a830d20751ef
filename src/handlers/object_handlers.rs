//! HTTP handlers for raw object operations: list, fetch, upload, delete.
//!
//! These translate query/path/header values into the typed backend calls
//! and serialize results into the published JSON envelopes. Upload bodies
//! are fully buffered; the router bounds them at the validator's ceiling.

use crate::{
    errors::GatewayError,
    handlers::{http_time_string, parse_http_time},
    models::object::FetchOutcome,
    services::{
        article_service::split_key,
        backend_service::{GatewayState, list_all},
        upload_service,
    },
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header, header::AsHeaderName},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Header naming the target directory for uploads.
const BUCKET_PREFIX_HEADER: &str = "bucket-prefix";

/// Response header echoing the fetched key.
const BUCKET_KEY_HEADER: &str = "bucket-key";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListedObject {
    pub bucket_key: String,
    pub file_name: String,
    pub size: i64,
    pub etag: String,
    pub last_modified: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: u16,
    pub num_objects: usize,
    pub content: Vec<ListedObject>,
}

/// GET `/list?prefix=` — accumulate the full listing across pages.
pub async fn list_objects(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, GatewayError> {
    let prefix = query.prefix.as_deref().filter(|p| !p.is_empty());
    let summaries = list_all(state.backend.as_ref(), prefix).await?;

    let content: Vec<ListedObject> = summaries
        .iter()
        .map(|summary| ListedObject {
            bucket_key: summary.key.clone(),
            file_name: split_key(&summary.key).1.to_string(),
            size: summary.size,
            etag: summary.etag.clone(),
            last_modified: http_time_string(&summary.last_modified),
        })
        .collect();

    Ok(Json(ListResponse {
        status: StatusCode::OK.as_u16(),
        num_objects: content.len(),
        content,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub etag: Option<String>,
    pub modified_since: Option<String>,
}

/// GET `/get/{*key}` — conditional fetch, body buffered and written out.
///
/// `etag` and `modified_since` are forwarded to the store untouched; a
/// "not modified" answer becomes a bare 304.
pub async fn get_object(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
    Query(query): Query<FetchQuery>,
) -> Result<Response, GatewayError> {
    let key = key.trim();
    let if_none_match = query
        .etag
        .as_deref()
        .map(str::trim)
        .filter(|etag| !etag.is_empty());
    let if_modified_since = query.modified_since.as_deref().and_then(parse_http_time);

    let outcome = state
        .backend
        .fetch(key, if_none_match, if_modified_since)
        .await?;

    let object = match outcome {
        FetchOutcome::Unmodified => return Ok(StatusCode::NOT_MODIFIED.into_response()),
        FetchOutcome::Found(object) => object,
    };

    let mut response = Response::new(Body::from(object.content.clone()));
    let headers = response.headers_mut();

    insert_header(headers, HeaderName::from_static(BUCKET_KEY_HEADER), &object.key);
    insert_header(
        headers,
        header::CONTENT_DISPOSITION,
        &format!("attachment; filename=\"{}\"", split_key(&object.key).1),
    );
    if let Some(etag) = object.etag.as_deref() {
        insert_header(headers, header::ETAG, etag);
    }
    if let Some(last_modified) = object.last_modified.as_ref() {
        insert_header(headers, header::LAST_MODIFIED, &http_time_string(last_modified));
    }
    if let Some(content_type) = object.content_type.as_deref() {
        insert_header(headers, header::CONTENT_TYPE, content_type);
    }

    Ok(response)
}

/// PUT `/put` — validate headers, buffer the body, store the object.
///
/// Responds 204 with the store's ETag echoed when one was assigned.
pub async fn put_object(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let filename = upload_service::validate(
        header_str(&headers, header::CONTENT_DISPOSITION),
        header_str(&headers, header::CONTENT_LENGTH),
    )?;
    let directory = header_str(&headers, BUCKET_PREFIX_HEADER);

    let declared_mime = header_str(&headers, header::CONTENT_TYPE).trim();
    let mime = if declared_mime.is_empty() {
        upload_service::sniff_content_type(&body)
    } else {
        declared_mime
    };

    let etag = state
        .backend
        .store(directory, &filename, body, mime)
        .await?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Some(etag) = etag.as_deref() {
        insert_header(response.headers_mut(), header::ETAG, etag);
    }
    Ok(response)
}

/// DELETE `/delete/{*key}` — idempotent removal; 204 even for absent keys.
pub async fn delete_object(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
) -> Result<StatusCode, GatewayError> {
    let (directory, filename) = split_key(key.trim());
    state.backend.remove(directory, filename).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl AsHeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Insert a header, skipping values that are not legal header text.
fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

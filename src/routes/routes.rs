//! Defines the gateway's routes.
//!
//! ## Structure
//! - `GET    /`               — route index
//! - `GET    /healthz`        — liveness
//! - `GET    /list`           — list objects (supports ?prefix=)
//! - `GET    /articles`       — derived article view
//! - `GET    /get/{*key}`     — fetch object (supports ?etag=, ?modified_since=)
//! - `PUT    /put`            — upload object (headers carry disposition,
//!                              length, target directory)
//! - `DELETE /delete/{*key}`  — remove object
//!
//! The wildcard `*key` allows nested keys like `Articles/foo/index.html`.

use crate::{
    handlers::{
        article_handlers::list_articles,
        health_handlers::{healthz, route_index},
        object_handlers::{delete_object, get_object, list_objects, put_object},
    },
    services::{backend_service::GatewayState, upload_service::FILE_LIMIT_BYTES},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, put},
};

/// Build and return the router for all gateway routes.
///
/// The router carries shared state (`GatewayState`) to all handlers. The
/// upload route bounds the realized body at the validator's declared-size
/// ceiling.
pub fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/", get(route_index))
        .route("/healthz", get(healthz))
        .route("/list", get(list_objects))
        .route("/articles", get(list_articles))
        .route("/get/{*key}", get(get_object))
        .route(
            "/put",
            put(put_object).layer(DefaultBodyLimit::max(FILE_LIMIT_BYTES as usize)),
        )
        .route("/delete/{*key}", delete(delete_object))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{Body, Bytes};
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::errors::{GatewayError, GatewayResult};
    use crate::models::object::{FetchOutcome, ObjectSummary, StoredObject};
    use crate::services::backend_service::ObjectBackend;

    #[derive(Debug, Clone, PartialEq)]
    struct FetchCall {
        key: String,
        if_none_match: Option<String>,
        if_modified_since: Option<DateTime<Utc>>,
    }

    /// In-memory backend scripted with a fixed set of objects.
    #[derive(Default)]
    struct FakeBackend {
        objects: Vec<ObjectSummary>,
        stored: Mutex<Vec<(String, String, String, usize)>>,
        removed: Mutex<Vec<(String, String)>>,
        fetches: Mutex<Vec<FetchCall>>,
    }

    impl FakeBackend {
        fn with_objects(keys: &[&str]) -> Self {
            let objects = keys
                .iter()
                .enumerate()
                .map(|(idx, key)| ObjectSummary {
                    key: (*key).to_string(),
                    size: 42,
                    last_modified: DateTime::from_timestamp(1_136_214_245, 0).unwrap(),
                    etag: format!("etag-{idx}"),
                })
                .collect();
            Self {
                objects,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ObjectBackend for FakeBackend {
        async fn list_page(
            &self,
            prefix: Option<&str>,
            _continuation_token: Option<&str>,
        ) -> GatewayResult<(Vec<ObjectSummary>, Option<String>)> {
            let page = self
                .objects
                .iter()
                .filter(|summary| prefix.is_none_or(|p| summary.key.starts_with(p)))
                .cloned()
                .collect();
            Ok((page, None))
        }

        async fn fetch(
            &self,
            key: &str,
            if_none_match: Option<&str>,
            if_modified_since: Option<DateTime<Utc>>,
        ) -> GatewayResult<FetchOutcome> {
            self.fetches.lock().unwrap().push(FetchCall {
                key: key.to_string(),
                if_none_match: if_none_match.map(ToOwned::to_owned),
                if_modified_since,
            });

            let Some(summary) = self.objects.iter().find(|s| s.key == key) else {
                return Err(GatewayError::NotFound(key.to_string()));
            };
            if if_none_match == Some(summary.etag.as_str()) {
                return Ok(FetchOutcome::Unmodified);
            }
            Ok(FetchOutcome::Found(StoredObject {
                key: summary.key.clone(),
                etag: Some(summary.etag.clone()),
                last_modified: Some(summary.last_modified),
                content_type: Some("text/html".into()),
                content: Bytes::from_static(b"<html></html>"),
            }))
        }

        async fn store(
            &self,
            directory: &str,
            filename: &str,
            bytes: Bytes,
            mime: &str,
        ) -> GatewayResult<Option<String>> {
            self.stored.lock().unwrap().push((
                directory.to_string(),
                filename.to_string(),
                mime.to_string(),
                bytes.len(),
            ));
            Ok(Some("stored-etag".into()))
        }

        async fn remove(&self, directory: &str, filename: &str) -> GatewayResult<()> {
            self.removed
                .lock()
                .unwrap()
                .push((directory.to_string(), filename.to_string()));
            Ok(())
        }
    }

    fn app_with(backend: Arc<FakeBackend>) -> Router {
        let state = GatewayState {
            backend: backend.clone(),
            article_prefix: Arc::from("Articles"),
            started: Arc::from("Mon, 02 Jan 2006 15:04:05 GMT"),
        };
        routes().with_state(state)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_produces_the_published_envelope() {
        let backend = Arc::new(FakeBackend::with_objects(&[
            "Articles/foo/index.html",
            "Articles/foo/img.png",
        ]));
        let app = app_with(backend);

        let response = app
            .oneshot(Request::builder().uri("/list").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["num_objects"], 2);
        assert_eq!(body["content"][0]["bucket_key"], "Articles/foo/index.html");
        assert_eq!(body["content"][0]["file_name"], "index.html");
        assert_eq!(body["content"][0]["size"], 42);
        assert_eq!(body["content"][0]["last_modified"], "Mon, 02 Jan 2006 15:04:05 GMT");
    }

    #[tokio::test]
    async fn list_forwards_the_prefix() {
        let backend = Arc::new(FakeBackend::with_objects(&[
            "Articles/foo/index.html",
            "Drafts/wip.html",
        ]));
        let app = app_with(backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/list?prefix=Drafts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["num_objects"], 1);
        assert_eq!(body["content"][0]["bucket_key"], "Drafts/wip.html");
    }

    #[tokio::test]
    async fn articles_groups_the_scoped_listing() {
        let backend = Arc::new(FakeBackend::with_objects(&[
            "Articles/foo/index.html",
            "Articles/foo/img.png",
            "Articles/bar/page.html",
            "Drafts/ignored.html",
        ]));
        let app = app_with(backend);

        let response = app
            .oneshot(Request::builder().uri("/articles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["httpStatus"], 200);
        assert_eq!(body["numArticles"], 2);

        let content = body["content"].as_array().unwrap();
        let foo = content
            .iter()
            .find(|a| a["articleKey"] == "Articles/foo/index.html")
            .unwrap();
        assert_eq!(foo["articleAssets"][0], "Articles/foo/img.png");

        let bar = content
            .iter()
            .find(|a| a["articleKey"] == "Articles/bar/page.html")
            .unwrap();
        // Empty asset lists are omitted from the JSON entirely.
        assert!(bar.get("articleAssets").is_none());
    }

    #[tokio::test]
    async fn get_sets_the_object_headers() {
        let backend = Arc::new(FakeBackend::with_objects(&["Articles/foo/index.html"]));
        let app = app_with(backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get/Articles/foo/index.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["bucket-key"], "Articles/foo/index.html");
        assert_eq!(
            headers["content-disposition"],
            "attachment; filename=\"index.html\""
        );
        assert_eq!(headers["etag"], "etag-0");
        assert_eq!(headers["last-modified"], "Mon, 02 Jan 2006 15:04:05 GMT");
        assert_eq!(headers["content-type"], "text/html");
    }

    #[tokio::test]
    async fn get_forwards_conditional_parameters_verbatim() {
        let backend = Arc::new(FakeBackend::with_objects(&["Articles/foo/index.html"]));
        let app = app_with(backend.clone());

        let uri = "/get/Articles/foo/index.html?etag=some-etag&modified_since=Mon,%2002%20Jan%202006%2015:04:05%20GMT";
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let fetches = backend.fetches.lock().unwrap();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].key, "Articles/foo/index.html");
        assert_eq!(fetches[0].if_none_match.as_deref(), Some("some-etag"));
        assert_eq!(
            fetches[0].if_modified_since,
            DateTime::from_timestamp(1_136_214_245, 0)
        );
    }

    #[tokio::test]
    async fn get_answers_304_when_the_store_reports_unmodified() {
        let backend = Arc::new(FakeBackend::with_objects(&["Articles/foo/index.html"]));
        let app = app_with(backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get/Articles/foo/index.html?etag=etag-0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn get_missing_key_is_404() {
        let backend = Arc::new(FakeBackend::with_objects(&[]));
        let app = app_with(backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get/Articles/none.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_stores_and_echoes_the_etag() {
        let backend = Arc::new(FakeBackend::default());
        let app = app_with(backend.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/put")
                    .header("content-disposition", r#"attachment; filename="notes.txt""#)
                    .header("content-length", "15")
                    .header("bucket-prefix", "Docs")
                    .body(Body::from("just some notes"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["etag"], "stored-etag");

        let stored = backend.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        let (directory, filename, mime, len) = &stored[0];
        assert_eq!(directory, "Docs");
        assert_eq!(filename, "notes.txt");
        // No content-type header was sent, so the type is sniffed.
        assert_eq!(mime, "text/plain; charset=utf-8");
        assert_eq!(*len, 15);
    }

    #[tokio::test]
    async fn put_without_a_filename_is_rejected_before_the_backend() {
        let backend = Arc::new(FakeBackend::default());
        let app = app_with(backend.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/put")
                    .header("content-disposition", "inline")
                    .header("content-length", "4")
                    .body(Body::from("data"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(backend.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_with_an_oversize_declaration_is_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let app = app_with(backend.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/put")
                    .header("content-disposition", r#"attachment; filename="big.bin""#)
                    .header("content-length", (FILE_LIMIT_BYTES + 1).to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(backend.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_a_204_even_for_absent_keys() {
        let backend = Arc::new(FakeBackend::default());
        let app = app_with(backend.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/delete/Articles/foo/old.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let removed = backend.removed.lock().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0], ("Articles/foo/".to_string(), "old.html".to_string()));
    }

    #[tokio::test]
    async fn index_and_healthz_answer_200() {
        let backend = Arc::new(FakeBackend::default());

        let response = app_with(backend.clone())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app_with(backend)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn healthz_reports_the_recorded_start_time() {
        let backend = Arc::new(FakeBackend::default());

        let response = app_with(backend)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["isAlive"], true);
        assert_eq!(body["isHealthy"], true);
        // Echoes the timestamp baked into the state at boot, not the
        // probe's own arrival time.
        assert_eq!(body["started"], "Mon, 02 Jan 2006 15:04:05 GMT");
    }
}

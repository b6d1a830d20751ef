//! Liveness probe and the route index served at `/`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::services::backend_service::GatewayState;

#[derive(Serialize)]
struct HealthResponse {
    #[serde(rename = "isAlive")]
    is_alive: bool,
    #[serde(rename = "isHealthy")]
    is_healthy: bool,
    started: String,
}

/// `GET /healthz`
///
/// Cheap liveness probe; never performs I/O against the backend. The
/// `started` field is the timestamp recorded when the state was built.
pub async fn healthz(State(state): State<GatewayState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            is_alive: true,
            is_healthy: true,
            started: state.started.to_string(),
        }),
    )
}

/// `GET /` — a small JSON index of the routes this gateway serves.
pub async fn route_index() -> impl IntoResponse {
    Json(json!({
        "/list": "GET list objects",
        "/articles": "GET list derived articles",
        "/get/{key}": "GET fetch object",
        "/put": "PUT upload object",
        "/delete/{key}": "DELETE remove object",
        "/healthz": "GET liveness",
    }))
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Typed errors returned by the core. Handlers never build error bodies by
/// hand; this enum carries enough to pick a status and a caller-visible
/// message.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport, auth, or remote failure talking to the object store.
    /// The detail string is logged server-side and never shown to callers.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The requested key does not exist in the bucket.
    #[error("object `{0}` not found")]
    NotFound(String),

    /// Upload rejected: no usable filename in the disposition header.
    #[error("invalid disposition: {0}")]
    InvalidDisposition(String),

    /// Upload rejected: declared content length missing or out of bounds.
    #[error("invalid size: {0}")]
    InvalidSize(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GatewayError::BackendUnavailable(detail) => {
                tracing::error!("backend call failed: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
            GatewayError::NotFound(key) => {
                (StatusCode::NOT_FOUND, format!("object `{key}` not found"))
            }
            GatewayError::InvalidDisposition(reason) | GatewayError::InvalidSize(reason) => {
                (StatusCode::BAD_REQUEST, reason)
            }
        };

        let body = Json(json!({
            "status": status.as_u16(),
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_hide_detail_behind_a_500() {
        let response =
            GatewayError::BackendUnavailable("dns lookup failed for bucket".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_keys_are_client_visible_404s() {
        let response = GatewayError::NotFound("Articles/gone.html".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_failures_are_400s() {
        let disposition =
            GatewayError::InvalidDisposition("filename is empty".into()).into_response();
        assert_eq!(disposition.status(), StatusCode::BAD_REQUEST);

        let size = GatewayError::InvalidSize("size must be positive".into()).into_response();
        assert_eq!(size.status(), StatusCode::BAD_REQUEST);
    }
}

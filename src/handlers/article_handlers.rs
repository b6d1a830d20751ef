//! Handler for the derived article view.

use crate::{
    errors::GatewayError,
    models::article::Article,
    services::{
        article_service::derive_articles,
        backend_service::{GatewayState, list_all},
    },
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    #[serde(rename = "httpStatus")]
    pub http_status: u16,
    #[serde(rename = "numArticles")]
    pub num_articles: usize,
    pub content: Vec<Article>,
}

/// GET `/articles` — list the article groupings under the configured root
/// prefix. Recomputed from a fresh listing on every call.
pub async fn list_articles(
    State(state): State<GatewayState>,
) -> Result<Json<ArticlesResponse>, GatewayError> {
    let summaries = list_all(state.backend.as_ref(), Some(state.article_prefix.as_ref())).await?;
    let content = derive_articles(&summaries);

    Ok(Json(ArticlesResponse {
        http_status: StatusCode::OK.as_u16(),
        num_articles: content.len(),
        content,
    }))
}

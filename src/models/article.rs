//! A derived logical document reconstructed from the flat key namespace.

use serde::Serialize;

/// One HTML page plus the asset files sharing its directory prefix.
///
/// Articles are never stored; they are recomputed from the current listing
/// on every request. A directory holds at most one `article_key`, and
/// `article_assets` may be empty. Field names and the omit-when-empty
/// behavior are part of the published JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Article {
    #[serde(rename = "articleKey", skip_serializing_if = "Option::is_none")]
    pub article_key: Option<String>,

    #[serde(rename = "articleAssets", skip_serializing_if = "Vec::is_empty")]
    pub article_assets: Vec<String>,
}

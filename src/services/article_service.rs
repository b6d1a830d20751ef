//! Article derivation: reconstructs a document/asset relationship from the
//! flat key namespace, purely by key-path convention.
//!
//! The remote store has no native hierarchy. Within a directory grouping,
//! the `.html` key becomes the article page and every other key is an
//! asset. This trades correctness under ambiguous layouts for zero extra
//! metadata storage.

use std::collections::HashMap;

use crate::models::article::Article;
use crate::models::object::ObjectSummary;

/// Group an accumulated listing into articles.
///
/// Entries with an empty filename (directory markers such as
/// `Articles/foo/`) are skipped and never create a grouping on their own.
/// When a directory holds more than one `.html` key, the last one in
/// listing order wins; that is a deliberate, documented policy. Output
/// order is unspecified.
pub fn derive_articles(summaries: &[ObjectSummary]) -> Vec<Article> {
    let mut groups: HashMap<&str, Article> = HashMap::new();

    for summary in summaries {
        let (directory, filename) = split_key(&summary.key);
        if filename.is_empty() {
            continue;
        }

        let article = groups.entry(directory).or_default();
        if filename.ends_with(".html") {
            article.article_key = Some(summary.key.clone());
        } else {
            article.article_assets.push(summary.key.clone());
        }
    }

    groups.into_values().collect()
}

/// Split a key on its last separator into `(directory, filename)`.
///
/// The directory keeps its trailing `/`; a key without any separator is
/// all filename.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(idx) => (&key[..idx + 1], &key[idx + 1..]),
        None => ("", key),
    }
}

//! Hybrid article search.
//!
//! Two ranked lists are built for a query:
//!
//! 1. *Exact*: suggestion phrases the query is a prefix of (heaviest first),
//!    then full-text hits (best first), deduplicated.
//! 2. *Vector*: nearest article embeddings to the embedded query. Only
//!    available when an embedder is configured; if the embedder fails the
//!    search degrades to exact results.
//!
//! The lists are interleaved one item at a time, skipping ids already
//! emitted, until `limit` results are collected or both lists run out.

use bv_core::{ArticleStorage, InferenceModel, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Semantic,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-based position in the merged list
    pub rank: usize,
    pub article_id: String,
    pub title: String,
    pub summary: String,
    pub matched_by: MatchKind,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Candidates fetched from each primitive before merging
    pub candidates: usize,
    pub suggestions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidates: 20,
            suggestions: 5,
        }
    }
}

pub struct HybridSearch {
    storage: Arc<dyn ArticleStorage>,
    embedder: Option<Arc<dyn InferenceModel>>,
    config: SearchConfig,
}

impl HybridSearch {
    pub fn new(storage: Arc<dyn ArticleStorage>) -> Self {
        Self {
            storage,
            embedder: None,
            config: SearchConfig::default(),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn InferenceModel>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let exact = self.exact_ids(query).await?;
        let vector = self.vector_ids(query).await?;
        debug!(
            "Search '{}': {} exact, {} semantic candidates",
            query,
            exact.len(),
            vector.len()
        );

        let mut results = Vec::new();
        for (article_id, matched_by) in merge_ranked(&exact, &vector, limit) {
            // Rows can vanish between ranking and loading.
            if let Some(article) = self.storage.get_article(&article_id).await? {
                results.push(SearchResult {
                    rank: results.len() + 1,
                    article_id,
                    title: article.title,
                    summary: article.summary,
                    matched_by,
                });
            }
        }
        Ok(results)
    }

    /// Distinct autocomplete phrases, heaviest first.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        // The same phrase may point at several articles.
        let hits = self.storage.suggest(prefix, limit.saturating_mul(4)).await?;
        let mut seen = HashSet::new();
        let mut phrases = Vec::new();
        for hit in hits {
            if seen.insert(hit.phrase.to_lowercase()) {
                phrases.push(hit.phrase);
                if phrases.len() == limit {
                    break;
                }
            }
        }
        Ok(phrases)
    }

    async fn exact_ids(&self, query: &str) -> Result<Vec<String>> {
        let suggestions = self.storage.suggest(query, self.config.suggestions).await?;
        let fulltext = self
            .storage
            .search_fulltext(query, self.config.candidates)
            .await?;

        let mut seen = HashSet::new();
        Ok(suggestions
            .into_iter()
            .map(|s| s.article_id)
            .chain(fulltext.into_iter().map(|hit| hit.article_id))
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }

    async fn vector_ids(&self, query: &str) -> Result<Vec<String>> {
        let embedder = match &self.embedder {
            Some(embedder) => embedder,
            None => return Ok(Vec::new()),
        };
        let vector = match embedder.generate_embedding(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(
                    "Embedding with {} failed, falling back to exact search: {}",
                    embedder.name(),
                    e
                );
                return Ok(Vec::new());
            }
        };
        let hits = self
            .storage
            .search_similar(&vector, self.config.candidates)
            .await?;
        Ok(hits.into_iter().map(|hit| hit.article_id).collect())
    }
}

/// Interleaves `exact` and `vector`, one from each per round.
pub fn merge_ranked(exact: &[String], vector: &[String], limit: usize) -> Vec<(String, MatchKind)> {
    let in_exact: HashSet<&str> = exact.iter().map(String::as_str).collect();
    let in_vector: HashSet<&str> = vector.iter().map(String::as_str).collect();
    let kind = |id: &str| match (in_exact.contains(id), in_vector.contains(id)) {
        (true, true) => MatchKind::Both,
        (false, true) => MatchKind::Semantic,
        _ => MatchKind::Exact,
    };

    let mut emitted = HashSet::new();
    let mut merged = Vec::new();
    let mut exact_iter = exact.iter();
    let mut vector_iter = vector.iter();

    while merged.len() < limit {
        let next_exact = exact_iter.next();
        let next_vector = vector_iter.next();
        if next_exact.is_none() && next_vector.is_none() {
            break;
        }
        for id in next_exact.into_iter().chain(next_vector) {
            if merged.len() < limit && emitted.insert(id.as_str()) {
                merged.push((id.clone(), kind(id)));
            }
        }
    }
    merged
}

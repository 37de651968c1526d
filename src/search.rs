//! Semantic search over the index store.
//!
//! Embeds the query with the same provider the index was built with,
//! retrieves nearest symbols, and normalizes distances into bounded scores.
//! The search engine is a read-only consumer of the store; the only write
//! it can trigger is indirect, when the facade resolves a provider mismatch
//! by forcing a reindex.

use std::sync::Arc;

use crate::config::SimilarityMetric;
use crate::embed::Embedder;
use crate::error::{IndexError, Result};
use crate::store::IndexStore;
use crate::types::SearchHit;

pub struct SearchEngine {
    store: Arc<IndexStore>,
    embedder: Arc<Embedder>,
}

impl SearchEngine {
    pub fn new(store: Arc<IndexStore>, embedder: Arc<Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Search for symbols semantically similar to `query`.
    ///
    /// `target_dirs` restricts hits to files under any of the given
    /// workspace-relative prefixes. An index that has never been built
    /// returns an empty result, never an error; a provider mismatch is an
    /// error until the caller reindexes.
    pub async fn search(
        &self,
        query: &str,
        target_dirs: &[String],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>> {
        let Some(stored_identity) = self.store.provider()? else {
            // Never indexed: nothing to search, by contract not an error
            return Ok(Vec::new());
        };

        let active_identity = self.embedder.identity();
        if stored_identity != active_identity {
            return Err(IndexError::ProviderMismatch {
                active: active_identity.to_string(),
                stored: stored_identity,
            });
        }

        let query_vector = self.embedder.embed(query).await?;
        let metric = self.store.metric()?;

        let prefixes = if target_dirs.is_empty() {
            None
        } else {
            Some(target_dirs)
        };

        // Over-fetch so the structural re-rank has a pool to work with
        let fetch_limit = limit.saturating_mul(2).max(limit);
        let neighbors = self
            .store
            .nearest_neighbors(&query_vector, fetch_limit, metric, prefixes)?;

        let mut hits: Vec<SearchHit> = neighbors
            .into_iter()
            .map(|(symbol, distance)| {
                let semantic = normalize_score(metric, distance);
                let score = (semantic + structural_boost(query, &symbol)).min(1.0);
                SearchHit { symbol, score }
            })
            .filter(|hit| hit.score >= min_score)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.file_path.cmp(&b.symbol.file_path))
                .then_with(|| a.symbol.start_byte.cmp(&b.symbol.start_byte))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Merge exact-match structural evidence into the semantic score.
///
/// A symbol whose name literally appears in the query gets a boost, weighted
/// by kind: the definition of a thing outranks places that merely use it.
fn structural_boost(query: &str, symbol: &crate::types::SymbolRecord) -> f32 {
    let name = symbol.name.to_lowercase();
    let name_matches = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|token| token.to_lowercase() == name);
    if !name_matches {
        return 0.0;
    }
    if symbol.kind.is_definition() {
        0.25
    } else if symbol.kind.is_reference() {
        0.1
    } else {
        0.05
    }
}

/// Map a raw distance to a bounded relevance score in [0, 1].
///
/// Cosine distance lives in [0, 2] and maps linearly; dot-product distance
/// is unbounded and maps through a logistic curve.
fn normalize_score(metric: SimilarityMetric, distance: f32) -> f32 {
    match metric {
        SimilarityMetric::Cosine => (1.0 - distance / 2.0).clamp(0.0, 1.0),
        SimilarityMetric::Dot => 1.0 / (1.0 + distance.exp()),
    }
}

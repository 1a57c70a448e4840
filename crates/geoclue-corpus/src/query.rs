use std::sync::Arc;

use tracing::debug;

use geoclue_core::config::RetrievalConfig;
use geoclue_core::error::{EmbedError, Error, Result};
use geoclue_core::traits::{EmbedMode, Embedder};
use geoclue_core::types::{EmbeddedDocument, Match};

use crate::similarity::cosine_similarity;
use crate::store::CorpusStore;

/// Scores free-text observations against one category of the corpus at a
/// time. Holds the store read-only; cheap to share behind an `Arc`.
pub struct QueryEngine {
    store: Arc<CorpusStore>,
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
}

impl QueryEngine {
    pub fn new(store: Arc<CorpusStore>, embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self { store, embedder, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Top matches for `description` among documents of `category`.
    ///
    /// Too-short descriptions and uncovered categories yield an empty result.
    /// Only scores strictly above the acceptance threshold are returned,
    /// best first, ties in corpus order.
    pub async fn score(&self, category: &str, description: &str) -> Result<Vec<Match>> {
        let description = description.trim();
        if description.is_empty() || description.chars().count() < self.config.min_description_chars {
            debug!(%category, "description too short to query");
            return Ok(Vec::new());
        }

        let query = self.embed_query(category, description).await?;

        let documents = self.store.documents_for(category);
        if documents.is_empty() {
            debug!(%category, "no documents for category");
            return Ok(Vec::new());
        }
        if let Some(dim) = self.store.dim() {
            if query.len() != dim {
                return Err(Error::EmbeddingDimensionMismatch {
                    category: category.to_string(),
                    context: "query embedding".to_string(),
                    expected: dim,
                    actual: query.len(),
                });
            }
        }

        let matches = rank_matches(
            category,
            &query,
            documents,
            self.config.acceptance_threshold,
            self.config.top_k,
        )?;
        debug!(%category, candidates = documents.len(), kept = matches.len(), "category scored");
        Ok(matches)
    }

    async fn embed_query(&self, category: &str, description: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .embedder
            .embed_batch(&[description.to_string()], EmbedMode::Query)
            .await
            .map_err(|e| Error::embedding_unavailable(category, e))?;
        if vectors.len() != 1 {
            return Err(Error::embedding_unavailable(
                category,
                EmbedError::Permanent(format!("expected 1 query vector, got {}", vectors.len())),
            ));
        }
        Ok(vectors.remove(0))
    }
}

/// Linear scan of `documents`: keep scores above `threshold`, sort best
/// first (stable, so ties keep corpus order) and cut to `top_k`.
pub fn rank_matches(
    category: &str,
    query: &[f32],
    documents: &[EmbeddedDocument],
    threshold: f32,
    top_k: usize,
) -> Result<Vec<Match>> {
    let mut scored: Vec<(f32, &EmbeddedDocument)> = Vec::new();
    for doc in documents {
        let score = cosine_similarity(query, &doc.embedding).map_err(|m| Error::EmbeddingDimensionMismatch {
            category: category.to_string(),
            context: format!("stored document of region '{}': \"{}\"", doc.region, doc.text),
            expected: m.expected,
            actual: m.actual,
        })?;
        if score > threshold {
            scored.push((score, doc));
        }
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(top_k);
    Ok(scored
        .into_iter()
        .map(|(score, doc)| Match { region: doc.region.clone(), text: doc.text.clone(), score })
        .collect())
}

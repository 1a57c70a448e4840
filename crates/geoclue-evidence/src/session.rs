//! One pass over an image: extract clues, score them, rank regions.

use std::sync::Arc;

use tracing::{info, warn};

use geoclue_core::error::Error;
use geoclue_core::traits::ClueExtractor;
use geoclue_core::types::{ClueHints, ImageInput, RegionScore};

use crate::{CategoryReport, EvidenceAggregator};

#[derive(Debug, Default)]
pub struct SessionReport {
    pub hints: ClueHints,
    pub ranking: Vec<RegionScore>,
    pub categories: Vec<CategoryReport>,
    /// Set when the extractor failed; the report then carries no evidence.
    pub extraction_error: Option<Error>,
}

impl SessionReport {
    pub fn has_prediction(&self) -> bool {
        !self.ranking.is_empty()
    }
}

pub struct Session {
    extractor: Arc<dyn ClueExtractor>,
    aggregator: Arc<EvidenceAggregator>,
    categories: Vec<String>,
}

impl Session {
    pub fn new(extractor: Arc<dyn ClueExtractor>, aggregator: Arc<EvidenceAggregator>, categories: Vec<String>) -> Self {
        Self { extractor, aggregator, categories }
    }

    pub async fn run(&self, image: &ImageInput) -> SessionReport {
        let clues = match self.extractor.extract(image).await {
            Ok(clues) => clues,
            Err(e) => {
                warn!(error = %e, "clue extraction failed");
                return SessionReport { extraction_error: Some(e), ..SessionReport::default() };
            }
        };

        let observations = clues.observations(&self.categories);
        info!(observations = observations.len(), "clues extracted");
        let evidence = self.aggregator.aggregate_detailed(&observations).await;

        SessionReport {
            hints: clues.hints,
            ranking: evidence.ranking,
            categories: evidence.categories,
            extraction_error: None,
        }
    }
}

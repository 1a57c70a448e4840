//! Turns per-category observations into a ranked list of candidate regions.

pub mod session;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, warn};

use geoclue_core::error::Error;
use geoclue_core::types::{has_evidence, Match, Observation, RegionScore};
use geoclue_corpus::QueryEngine;

pub use session::{Session, SessionReport};

#[derive(Debug)]
pub enum CategoryOutcome {
    Matched(Vec<Match>),
    Failed(Error),
}

#[derive(Debug)]
pub struct CategoryReport {
    pub category: String,
    pub description: String,
    pub outcome: CategoryOutcome,
}

impl CategoryReport {
    pub fn matches(&self) -> &[Match] {
        match &self.outcome {
            CategoryOutcome::Matched(m) => m,
            CategoryOutcome::Failed(_) => &[],
        }
    }
}

#[derive(Debug, Default)]
pub struct EvidenceReport {
    pub ranking: Vec<RegionScore>,
    /// One entry per scored observation, in observation order.
    pub categories: Vec<CategoryReport>,
}

impl EvidenceReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.categories.iter().filter_map(|c| match &c.outcome {
            CategoryOutcome::Failed(e) => Some((c.category.as_str(), e)),
            CategoryOutcome::Matched(_) => None,
        })
    }
}

pub struct EvidenceAggregator {
    engine: Arc<QueryEngine>,
    top_k: usize,
}

impl EvidenceAggregator {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        let top_k = engine.config().top_k;
        Self { engine, top_k }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn aggregate(&self, observations: &[Observation]) -> Vec<RegionScore> {
        self.aggregate_detailed(observations).await.ranking
    }

    /// Scores every observation concurrently and sums match scores per
    /// region. A failing category is reported and contributes nothing.
    pub async fn aggregate_detailed(&self, observations: &[Observation]) -> EvidenceReport {
        let scored: Vec<&Observation> = observations.iter().filter(|o| has_evidence(&o.description)).collect();
        if scored.len() < observations.len() {
            debug!(dropped = observations.len() - scored.len(), "observations without evidence dropped");
        }

        let results = join_all(scored.iter().map(|o| self.engine.score(&o.category, &o.description))).await;

        let categories: Vec<CategoryReport> = scored
            .into_iter()
            .zip(results)
            .map(|(obs, result)| {
                let outcome = match result {
                    Ok(matches) => CategoryOutcome::Matched(matches),
                    Err(e) => {
                        if e.is_integrity_violation() {
                            error!(category = %obs.category, error = %e, "corpus integrity violation");
                        } else {
                            warn!(category = %obs.category, error = %e, "category unavailable, skipping");
                        }
                        CategoryOutcome::Failed(e)
                    }
                };
                CategoryReport { category: obs.category.clone(), description: obs.description.clone(), outcome }
            })
            .collect();

        let ranking = rank_regions(categories.iter().map(CategoryReport::matches), self.top_k);
        EvidenceReport { ranking, categories }
    }
}

/// Sums match scores per region and returns the `top_k` best totals.
///
/// Ties keep the order in which regions were first seen.
pub fn rank_regions<'a>(groups: impl IntoIterator<Item = &'a [Match]>, top_k: usize) -> Vec<RegionScore> {
    let mut ranking: Vec<RegionScore> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for m in groups.into_iter().flatten() {
        let slot = *index.entry(m.region.as_str()).or_insert_with(|| {
            ranking.push(RegionScore { region: m.region.clone(), score: 0.0 });
            ranking.len() - 1
        });
        ranking[slot].score += f64::from(m.score);
    }
    ranking.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranking.truncate(top_k);
    ranking
}

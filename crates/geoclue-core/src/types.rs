//! Domain types shared by the corpus builder, the store and the evidence
//! aggregator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A flattened clue that has not been embedded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueRecord {
    pub region: String,
    pub category: String,
    pub text: String,
}

/// One snapshot row.
///
/// `embedding` is `None` when the embedding service never produced a vector
/// for this clue; such rows are skipped when the snapshot is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub region: String,
    pub category: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(record: ClueRecord, embedding: Option<Vec<f32>>) -> Self {
        Self { text: record.text, region: record.region, category: record.category, embedding }
    }
}

/// A queryable document held by the corpus store. Always carries a vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDocument {
    pub region: String,
    pub category: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A transient query: one observed clue for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub category: String,
    pub description: String,
}

impl Observation {
    pub fn new(category: impl Into<String>, description: impl Into<String>) -> Self {
        Self { category: category.into(), description: description.into() }
    }
}

/// A document that scored above the acceptance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub region: String,
    pub text: String,
    pub score: f32,
}

/// One row of the aggregated ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionScore {
    pub region: String,
    pub score: f64,
}

/// Informational fields returned by clue extraction. Never scored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueHints {
    pub visible_text: Option<String>,
    pub language_guess: Option<String>,
    pub city_names: Option<String>,
}

/// Output of the clue-extraction service for one image.
///
/// `descriptions` keeps the order the service reported categories in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedClues {
    pub descriptions: IndexMap<String, String>,
    pub hints: ClueHints,
}

impl ExtractedClues {
    /// Observations for `categories`, in that order, skipping categories the
    /// extractor left empty or marked as "none".
    pub fn observations(&self, categories: &[String]) -> Vec<Observation> {
        categories
            .iter()
            .filter_map(|category| {
                let description = self.descriptions.get(category)?;
                has_evidence(description).then(|| Observation::new(category.clone(), description.trim()))
            })
            .collect()
    }
}

/// `false` for empty values and the literal "none" (any case).
pub fn has_evidence(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case("none")
}

/// Image handed to the clue-extraction service.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self { bytes, mime_type: mime_type.into() }
    }

    /// Guess the mime type from a file extension, defaulting to PNG.
    pub fn mime_for_path(path: &std::path::Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            _ => "image/png",
        }
    }
}

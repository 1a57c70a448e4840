use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use geoclue_core::config::RetrievalConfig;
use geoclue_core::error::{EmbedError, Error};
use geoclue_core::traits::{ClueExtractor, EmbedMode, Embedder};
use geoclue_core::types::{Document, ExtractedClues, ImageInput};
use geoclue_corpus::{CorpusStore, QueryEngine};
use geoclue_evidence::EvidenceAggregator;

/// Looks texts up in a fixed table. Texts listed in `failing` return a
/// transient error; anything else unknown is a permanent error.
pub struct TableEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    failing: Vec<String>,
}

impl TableEmbedder {
    pub fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
        Self { vectors: pairs.iter().map(|(t, v)| (t.to_string(), v.clone())).collect(), failing: Vec::new() }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    fn embedder_id(&self) -> &str {
        "table"
    }

    async fn embed_batch(&self, texts: &[String], _mode: EmbedMode) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts
            .iter()
            .map(|t| {
                if self.failing.contains(t) {
                    return Err(EmbedError::Transient("503 unavailable".into()));
                }
                self.vectors.get(t).cloned().ok_or_else(|| EmbedError::Permanent(format!("unknown text '{t}'")))
            })
            .collect()
    }
}

pub struct FixedExtractor(pub Result<ExtractedClues, String>);

#[async_trait]
impl ClueExtractor for FixedExtractor {
    async fn extract(&self, _image: &ImageInput) -> Result<ExtractedClues, Error> {
        self.0.clone().map_err(Error::ExtractionUnavailable)
    }
}

fn doc(region: &str, category: &str, text: &str, embedding: Vec<f32>) -> Document {
    Document { text: text.into(), region: region.into(), category: category.into(), embedding: Some(embedding) }
}

/// Japan and Poland poles, a Japanese road line and a Kenyan plate.
pub fn corpus() -> CorpusStore {
    CorpusStore::from_documents(vec![
        doc("Japan", "pole_type", "wooden octagonal pole", vec![1.0, 0.0, 0.0]),
        doc("Poland", "pole_type", "concrete round pole", vec![0.0, 1.0, 0.0]),
        doc("Japan", "road_lines", "white outer lines", vec![0.0, 0.0, 1.0]),
        doc("Kenya", "plates", "yellow rear plate", vec![0.0, 1.0, 0.0]),
    ])
    .unwrap()
}

/// Queries: "wooden pole" scores Japan 0.6 / Poland 0.8, "white lines"
/// scores Japan 0.7, "yellow plate" scores Kenya 0.8.
pub fn embedder() -> TableEmbedder {
    TableEmbedder::new(&[
        ("wooden pole", vec![0.6, 0.8, 0.0]),
        ("white lines", vec![0.0, 0.714_142_8, 0.7]),
        ("yellow plate", vec![0.6, 0.8, 0.0]),
        ("short", vec![1.0, 0.0]),
    ])
}

pub fn aggregator(embedder: TableEmbedder) -> EvidenceAggregator {
    let config = RetrievalConfig { top_k: 10, ..RetrievalConfig::default() };
    EvidenceAggregator::new(Arc::new(QueryEngine::new(Arc::new(corpus()), Arc::new(embedder), config)))
}

use std::collections::HashMap;
use std::path::Path;

use tracing::{error, info, warn};

use geoclue_core::error::{Error, Result};
use geoclue_core::types::{Document, EmbeddedDocument};

use crate::snapshot::read_snapshot;

/// Immutable, category-partitioned corpus.
///
/// Every held document carries an embedding, and all embeddings share one
/// length. Within a category, documents keep snapshot order.
#[derive(Debug, Default)]
pub struct CorpusStore {
    partitions: HashMap<String, Vec<EmbeddedDocument>>,
    dim: Option<usize>,
    len: usize,
    skipped: usize,
}

impl CorpusStore {
    /// Load a snapshot written by the corpus builder.
    pub fn load(path: &Path) -> Result<Self> {
        let documents = read_snapshot(path)?;
        let store = Self::from_documents(documents)?;
        info!(
            path = %path.display(),
            documents = store.len,
            categories = store.partitions.len(),
            dim = store.dim.unwrap_or(0),
            skipped = store.skipped,
            "corpus loaded"
        );
        Ok(store)
    }

    /// Partition `documents`, dropping rows without an embedding and
    /// rejecting any embedding whose length differs from the first one.
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Result<Self> {
        let mut store = Self::default();
        for doc in documents {
            let embedding = match doc.embedding {
                Some(v) if !v.is_empty() => v,
                _ => {
                    warn!(region = %doc.region, category = %doc.category, "skipping document without embedding");
                    store.skipped += 1;
                    continue;
                }
            };
            match store.dim {
                None => store.dim = Some(embedding.len()),
                Some(expected) if expected != embedding.len() => {
                    error!(region = %doc.region, category = %doc.category, expected, actual = embedding.len(), "embedding length mismatch in snapshot");
                    return Err(Error::EmbeddingDimensionMismatch {
                        category: doc.category,
                        context: format!("stored document of region '{}': \"{}\"", doc.region, doc.text),
                        expected,
                        actual: embedding.len(),
                    });
                }
                Some(_) => {}
            }
            store.partitions.entry(doc.category.clone()).or_default().push(EmbeddedDocument {
                region: doc.region,
                category: doc.category,
                text: doc.text,
                embedding,
            });
            store.len += 1;
        }
        Ok(store)
    }

    /// Documents of `category` in insertion order; empty for unknown categories.
    pub fn documents_for(&self, category: &str) -> &[EmbeddedDocument] {
        self.partitions.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut cats: Vec<&str> = self.partitions.keys().map(String::as_str).collect();
        cats.sort_unstable();
        cats
    }

    /// Embedding length shared by every document; `None` for an empty store.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rows dropped at load for lacking an embedding.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(region: &str, category: &str, text: &str, embedding: Option<Vec<f32>>) -> Document {
        Document { region: region.into(), category: category.into(), text: text.into(), embedding }
    }

    #[test]
    fn partitions_by_category_preserving_order() {
        let store = CorpusStore::from_documents(vec![
            doc("Japan", "pole_type", "wooden octagonal pole", Some(vec![1.0, 0.0])),
            doc("Japan", "plates", "white plate", Some(vec![0.0, 1.0])),
            doc("Poland", "pole_type", "concrete round pole", Some(vec![0.5, 0.5])),
        ])
        .unwrap();

        let poles: Vec<&str> = store.documents_for("pole_type").iter().map(|d| d.region.as_str()).collect();
        assert_eq!(poles, vec!["Japan", "Poland"]);
        assert_eq!(store.categories(), vec!["plates", "pole_type"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.dim(), Some(2));
    }

    #[test]
    fn absent_category_is_empty_not_error() {
        let store = CorpusStore::from_documents(vec![doc("Japan", "plates", "white plate", Some(vec![1.0]))]).unwrap();
        assert!(store.documents_for("bollard_type").is_empty());
        assert!(CorpusStore::default().documents_for("anything").is_empty());
    }

    #[test]
    fn missing_embeddings_are_skipped() {
        let store = CorpusStore::from_documents(vec![
            doc("Japan", "plates", "white plate", None),
            doc("Japan", "plates", "yellow plate", Some(vec![])),
            doc("Kenya", "plates", "yellow rear plate", Some(vec![0.3, 0.4])),
        ])
        .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.skipped(), 2);
        assert_eq!(store.documents_for("plates")[0].region, "Kenya");
    }

    #[test]
    fn wrong_length_embedding_rejects_the_corpus() {
        let err = CorpusStore::from_documents(vec![
            doc("Japan", "pole_type", "wooden octagonal pole", Some(vec![1.0, 0.0, 0.0])),
            doc("Poland", "pole_type", "concrete round pole", Some(vec![1.0, 0.0, 0.0, 0.0])),
        ])
        .unwrap_err();
        match err {
            Error::EmbeddingDimensionMismatch { category, expected, actual, .. } => {
                assert_eq!(category, "pole_type");
                assert_eq!((expected, actual), (3, 4));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::ClueRecord;

/// Value stored under a region/category pair: one clue or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClueEntry {
    Single(String),
    Multi(Vec<String>),
}

impl ClueEntry {
    pub fn texts(&self) -> &[String] {
        match self {
            ClueEntry::Single(text) => std::slice::from_ref(text),
            ClueEntry::Multi(texts) => texts.as_slice(),
        }
    }
}

/// Nested source taxonomy: region -> category -> clue(s).
///
/// Key order from the source file is preserved, so flattening the same file
/// always yields documents in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Taxonomy {
    regions: IndexMap<String, IndexMap<String, ClueEntry>>,
}

/// Result of flattening a taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattened {
    pub records: Vec<ClueRecord>,
    pub skipped_empty: usize,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Taxonomy(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&content).map_err(|e| match e {
            Error::Taxonomy(msg) => Error::Taxonomy(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Taxonomy(e.to_string()))
    }

    pub fn insert(&mut self, region: impl Into<String>, category: impl Into<String>, entry: ClueEntry) {
        self.regions.entry(region.into()).or_default().insert(category.into(), entry);
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// One record per clue string, in source order. Clue strings are trimmed
    /// and blank ones are dropped.
    pub fn flatten(&self) -> Flattened {
        let mut out = Flattened::default();
        for (region, categories) in &self.regions {
            for (category, entry) in categories {
                for text in entry.texts() {
                    let text = text.trim();
                    if text.is_empty() {
                        debug!(%region, %category, "skipping blank clue");
                        out.skipped_empty += 1;
                        continue;
                    }
                    out.records.push(ClueRecord {
                        region: region.clone(),
                        category: category.clone(),
                        text: text.to_string(),
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_and_multi_entries_flatten_in_order() {
        let tax = Taxonomy::from_json_str(
            r#"{
                "Japan": {"pole_type": ["wooden octagonal pole", "concrete pole with yellow sleeve"],
                          "plates": "white plate"},
                "Poland": {"pole_type": "concrete round pole"}
            }"#,
        )
        .expect("parse");

        let flat = tax.flatten();
        let texts: Vec<&str> = flat.records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["wooden octagonal pole", "concrete pole with yellow sleeve", "white plate", "concrete round pole"]
        );
        assert_eq!(flat.records[2].category, "plates");
        assert_eq!(flat.records[3].region, "Poland");
        assert_eq!(flat.skipped_empty, 0);
    }

    #[test]
    fn blank_clues_are_skipped_and_counted() {
        let mut tax = Taxonomy::new();
        tax.insert("Kenya", "road_lines", ClueEntry::Multi(vec!["  ".into(), " yellow edges ".into()]));
        tax.insert("Kenya", "plates", ClueEntry::Single(String::new()));
        tax.insert("Kenya", "bollard_type", ClueEntry::Multi(vec![]));

        let flat = tax.flatten();
        assert_eq!(flat.records.len(), 1);
        assert_eq!(flat.records[0].text, "yellow edges");
        assert_eq!(flat.skipped_empty, 2);
    }

    #[test]
    fn unexpected_value_shape_is_rejected() {
        let err = Taxonomy::from_json_str(r#"{"Chile": {"pole_type": 3}}"#).unwrap_err();
        assert!(matches!(err, Error::Taxonomy(_)), "got {err:?}");
    }
}

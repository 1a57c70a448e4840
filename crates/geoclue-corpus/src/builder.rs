//! Offline corpus build: flatten the taxonomy, embed clues in fixed-size
//! batches, write the snapshot.
//!
//! Batches are independent. A failed batch is logged, followed by the
//! configured backoff, and its clues are left out of the snapshot; the build
//! then moves on to the next batch.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use geoclue_core::config::RetrievalConfig;
use geoclue_core::error::{EmbedError, Error, Result};
use geoclue_core::taxonomy::Taxonomy;
use geoclue_core::traits::{EmbedMode, Embedder};
use geoclue_core::types::{ClueRecord, Document};

use crate::snapshot::write_snapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub documents: usize,
    pub transient: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Non-blank clues found in the taxonomy.
    pub clues: usize,
    pub embedded: usize,
    pub skipped_empty: usize,
    pub failed_batches: Vec<BatchFailure>,
}

impl BuildReport {
    pub fn failed_documents(&self) -> usize {
        self.failed_batches.iter().map(|f| f.documents).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Embedded documents only, in taxonomy order.
    pub documents: Vec<Document>,
    pub report: BuildReport,
}

pub struct CorpusBuilder {
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
    show_progress: bool,
}

impl CorpusBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self { embedder, config, show_progress: false }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn build(&self, taxonomy: &Taxonomy) -> BuildOutput {
        let flat = taxonomy.flatten();
        info!(
            regions = taxonomy.region_count(),
            clues = flat.records.len(),
            skipped_empty = flat.skipped_empty,
            "taxonomy flattened"
        );
        let mut output = self.embed_records(flat.records).await;
        output.report.skipped_empty = flat.skipped_empty;
        output
    }

    /// Build and write the snapshot to `path`. Refuses to write a corpus in
    /// which nothing was embedded.
    pub async fn build_snapshot(&self, taxonomy: &Taxonomy, path: &Path) -> Result<BuildReport> {
        let output = self.build(taxonomy).await;
        if output.documents.is_empty() {
            return Err(Error::Operation(format!(
                "no clue was embedded ({} of {} batches failed); snapshot not written",
                output.report.failed_batches.len(),
                output.report.clues.div_ceil(self.config.batch_size.max(1)),
            )));
        }
        write_snapshot(path, &output.documents)?;
        info!(path = %path.display(), documents = output.documents.len(), "snapshot written");
        Ok(output.report)
    }

    pub async fn embed_records(&self, records: Vec<ClueRecord>) -> BuildOutput {
        let batch_size = self.config.batch_size.max(1);
        let mut output = BuildOutput {
            documents: Vec::with_capacity(records.len()),
            report: BuildReport { clues: records.len(), ..BuildReport::default() },
        };
        let pb = self.progress_bar(records.len());
        let mut dim: Option<usize> = None;

        for (batch_index, batch) in records.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
            let result = self
                .embedder
                .embed_batch(&texts, EmbedMode::Document)
                .await
                .and_then(|vectors| check_batch(vectors, batch.len(), &mut dim));
            match result {
                Ok(vectors) => {
                    for (record, vector) in batch.iter().cloned().zip(vectors) {
                        output.documents.push(Document::new(record, Some(vector)));
                    }
                    output.report.embedded += batch.len();
                }
                Err(e) => {
                    warn!(batch = batch_index, documents = batch.len(), error = %e, "embedding batch failed");
                    output.report.failed_batches.push(BatchFailure {
                        batch_index,
                        documents: batch.len(),
                        transient: e.is_transient(),
                        reason: e.to_string(),
                    });
                    let backoff = self.config.backoff();
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("done");
        info!(
            embedded = output.report.embedded,
            failed = output.report.failed_documents(),
            "embedding pass finished"
        );
        output
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} clues ({percent}%) {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}

/// A response is usable only if it has one non-empty vector per input, every
/// vector matches the length seen so far in this build, and every value is
/// finite. JSON cannot carry NaN or infinity, so such a row could not be read
/// back from the snapshot.
fn check_batch(vectors: Vec<Vec<f32>>, expected: usize, dim: &mut Option<usize>) -> std::result::Result<Vec<Vec<f32>>, EmbedError> {
    if vectors.len() != expected {
        return Err(EmbedError::Permanent(format!("expected {} vectors, got {}", expected, vectors.len())));
    }
    let want = dim.or_else(|| vectors.first().map(Vec::len)).unwrap_or(0);
    if want == 0 {
        return Err(EmbedError::Permanent("empty embedding vector".into()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != want) {
        return Err(EmbedError::Permanent(format!("vector length {} differs from corpus dimension {}", bad.len(), want)));
    }
    if let Some(row) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
        return Err(EmbedError::Permanent(format!("non-finite value in vector {} of batch", row)));
    }
    *dim = Some(want);
    Ok(vectors)
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use geoclue_core::config::RetrievalConfig;
use geoclue_core::error::EmbedError;
use geoclue_core::traits::{EmbedMode, Embedder};

/// Embedder with hand-picked vectors; can be told to fail chosen calls.
pub struct ScriptedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fail_calls: Vec<usize>,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: pairs.iter().map(|(t, v)| (t.to_string(), v.clone())).collect(),
            fail_calls: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_calls(mut self, calls: &[usize]) -> Self {
        self.fail_calls = calls.to_vec();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    fn embedder_id(&self) -> &str {
        "scripted"
    }

    async fn embed_batch(&self, texts: &[String], _mode: EmbedMode) -> Result<Vec<Vec<f32>>, EmbedError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_calls.contains(&call) {
            return Err(EmbedError::Transient("429 rate limited".into()));
        }
        texts
            .iter()
            .map(|t| self.vectors.get(t).cloned().ok_or_else(|| EmbedError::Permanent(format!("unscripted text '{t}'"))))
            .collect()
    }
}

pub fn quick_config(batch_size: usize) -> RetrievalConfig {
    RetrievalConfig { batch_size, backoff_seconds: 0.0, ..RetrievalConfig::default() }
}

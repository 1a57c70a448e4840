use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use geoclue_core::config::Settings;
use geoclue_core::traits::{ClueExtractor, Embedder};

pub mod fake;
pub mod gemini;
pub mod models;
pub mod vision;

pub use fake::{FakeEmbedder, FAKE_DIM};
pub use gemini::GeminiEmbedder;
pub use models::{list_models, GENERATE_CONTENT};
pub use vision::GeminiClueExtractor;

/// `APP_USE_FAKE_EMBEDDINGS=1|true` swaps the remote model for `FakeEmbedder`.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        info!("🧪 Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::default()));
    }
    let embedder = GeminiEmbedder::new(&settings.service, &settings.retrieval.embedding_model)?;
    info!(embedder = embedder.embedder_id(), "using remote embedder");
    Ok(Arc::new(embedder))
}

pub fn get_clue_extractor(settings: &Settings) -> Result<Arc<dyn ClueExtractor>> {
    Ok(Arc::new(GeminiClueExtractor::new(&settings.service, &settings.assistant.scored_categories)?))
}

use async_trait::async_trait;

use crate::error::{EmbedError, Error};
use crate::types::{ExtractedClues, ImageInput};

/// Which side of a retrieval pair a text is embedded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Document,
    Query,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `gemini:models/text-embedding-004`).
    fn embedder_id(&self) -> &str;
    /// Compute one embedding per input text, in input order.
    async fn embed_batch(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vec<f32>>, EmbedError>;
}

#[async_trait]
pub trait ClueExtractor: Send + Sync {
    /// Describe the clues visible in `image`. Failures map to
    /// `Error::ExtractionUnavailable`.
    async fn extract(&self, image: &ImageInput) -> Result<ExtractedClues, Error>;
}

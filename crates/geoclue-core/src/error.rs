use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid taxonomy: {0}")]
    Taxonomy(String),

    #[error("Corpus unavailable at {}: {reason}", path.display())]
    CorpusUnavailable { path: PathBuf, reason: String },

    #[error("Embedding unavailable for category '{category}': {source}")]
    EmbeddingUnavailable {
        category: String,
        #[source]
        source: EmbedError,
    },

    #[error("Embedding dimension mismatch in category '{category}' ({context}): expected {expected}, got {actual}")]
    EmbeddingDimensionMismatch {
        category: String,
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Clue extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by an embedding service.
///
/// `Transient` covers rate limiting, network trouble and server-side errors
/// where retrying later may succeed. `Permanent` covers rejected input and
/// responses that cannot be interpreted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbedError {
    #[error("transient embedding failure: {0}")]
    Transient(String),

    #[error("permanent embedding failure: {0}")]
    Permanent(String),
}

impl EmbedError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbedError::Transient(_))
    }
}

impl Error {
    pub fn embedding_unavailable(category: impl Into<String>, source: EmbedError) -> Self {
        Error::EmbeddingUnavailable { category: category.into(), source }
    }

    /// Errors that indicate corrupted corpus data rather than a flaky service.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Error::EmbeddingDimensionMismatch { .. })
    }
}

//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid parameters, missing credentials or a missing index.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generative model failed to produce an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An indexing run was aborted while processing a batch.
    #[error("Indexing aborted at batch covering ids {first_id}..={last_id}: {source}")]
    BatchFailed {
        /// First chunk id of the failed batch.
        first_id: u64,
        /// Last chunk id of the failed batch.
        last_id: u64,
        /// The provider or store failure that stopped the run.
        #[source]
        source: Box<RagError>,
    },

    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Whether this error is a provider failure (embedding or generation),
    /// possibly wrapped in a failed batch.
    pub fn is_provider_error(&self) -> bool {
        match self {
            Self::EmbeddingError { .. } | Self::GenerationError { .. } => true,
            Self::BatchFailed { source, .. } => source.is_provider_error(),
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

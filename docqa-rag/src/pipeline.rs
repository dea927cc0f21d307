//! Question-answering pipeline orchestrator.
//!
//! The [`QaPipeline`] is built once at process start and owns every
//! collaborator: an [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`],
//! and optionally a [`GenerativeModel`]. The [`Indexer`], [`Retriever`] and
//! [`AnswerAssembler`] receive those collaborators from it instead of
//! constructing their own.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{QaPipeline, RagConfig, InMemoryVectorStore, HashEmbeddingProvider};
//!
//! let pipeline = QaPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generative_model(Arc::new(my_model))
//!     .build()?;
//!
//! pipeline.rebuild(&documents).await?;
//! let answer = pipeline.ask("How do I add a modifier?").await?;
//! ```

use std::sync::Arc;

use tracing::info;

use crate::answer::AnswerAssembler;
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Answer, Chunk, Document, RetrievalContext};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerativeModel;
use crate::indexer::{IndexReport, Indexer};
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// The ingestion and question-answering pipeline.
///
/// Construct one via [`QaPipeline::builder()`].
pub struct QaPipeline {
    config: RagConfig,
    vector_store: Arc<dyn VectorStore>,
    indexer: Indexer,
    retriever: Retriever,
    assembler: Option<AnswerAssembler>,
}

impl QaPipeline {
    /// Create a new [`QaPipelineBuilder`].
    pub fn builder() -> QaPipelineBuilder {
        QaPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the indexer.
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Return the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Return the answer assembler, if a generative model was configured.
    pub fn assembler(&self) -> Option<&AnswerAssembler> {
        self.assembler.as_ref()
    }

    /// Wipe the collection and index `documents` from scratch.
    ///
    /// # Errors
    ///
    /// See [`Indexer::rebuild`].
    pub async fn rebuild(&self, documents: &[Document]) -> Result<IndexReport> {
        self.indexer.rebuild(documents).await
    }

    /// Wipe the collection and index pre-chunked records from scratch.
    ///
    /// # Errors
    ///
    /// See [`Indexer::rebuild_chunks`].
    pub async fn rebuild_chunks(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        self.indexer.rebuild_chunks(chunks).await
    }

    /// Number of records in the vector store.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn count(&self) -> Result<usize> {
        self.vector_store.count().await
    }

    /// Retrieve the configured `top_k` passages for `query`.
    ///
    /// # Errors
    ///
    /// See [`Retriever::retrieve`].
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalContext> {
        self.retriever.retrieve(query, self.config.top_k).await
    }

    /// Answer `query` from the indexed corpus.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no generative model was configured,
    /// otherwise the retrieval or generation error for this question.
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        self.ask_with_k(query, self.config.top_k).await
    }

    /// Answer `query` using `k` retrieved passages.
    ///
    /// # Errors
    ///
    /// Same as [`ask`](Self::ask).
    pub async fn ask_with_k(&self, query: &str, k: usize) -> Result<Answer> {
        let assembler = self.assembler.as_ref().ok_or_else(|| {
            RagError::ConfigError("a generative model is required to answer questions".to_string())
        })?;

        let context = self.retriever.retrieve(query, k).await?;
        let answer = assembler.answer(query, &context).await?;
        info!(k, sources = answer.sources.len(), "question answered");
        Ok(answer)
    }
}

/// Builder for constructing a [`QaPipeline`].
///
/// `embedding_provider` and `vector_store` are required. `config` defaults to
/// [`RagConfig::default`], `chunker` to a [`RecursiveChunker`] built from the
/// config, and without a `generative_model` the pipeline can ingest and
/// retrieve but not answer.
#[derive(Default)]
pub struct QaPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    generative_model: Option<Arc<dyn GenerativeModel>>,
    persona: Option<String>,
}

impl QaPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set a custom document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the generative model used to answer questions.
    pub fn generative_model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.generative_model = Some(model);
        self
    }

    /// Override the persona instruction of the answer prompt.
    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Build the [`QaPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required collaborator is missing
    /// or the configuration is invalid.
    pub fn build(self) -> Result<QaPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        let indexer = Indexer::new(
            config.clone(),
            chunker,
            embedding_provider.clone(),
            vector_store.clone(),
        );
        let retriever = Retriever::new(embedding_provider, vector_store.clone());
        let assembler = self.generative_model.map(|model| {
            let assembler = AnswerAssembler::new(model);
            match self.persona {
                Some(persona) => assembler.with_persona(persona),
                None => assembler,
            }
        });

        Ok(QaPipeline { config, vector_store, indexer, retriever, assembler })
    }
}

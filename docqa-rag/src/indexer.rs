//! Batched ingestion: chunk → embed → upsert.
//!
//! The [`Indexer`] flattens every document's chunks into one ordered sequence
//! (document order, then position within the document), cuts it into batches
//! of `batch_size`, and for each batch makes exactly one embedding call
//! followed by one upsert. A chunk's id is its position in the flat sequence,
//! so the same input always produces the same ids. The store is flushed once,
//! after the last batch; an aborted run commits nothing.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, IndexRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Summary of a completed indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Number of source documents (or distinct sources for pre-chunked input).
    pub documents: usize,
    /// Number of chunks produced.
    pub chunks: usize,
    /// Number of embed+upsert round-trips.
    pub batches: usize,
    /// Number of records upserted into the vector store.
    pub records_written: usize,
}

/// Drives chunks through the embedding provider into the vector store.
pub struct Indexer {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl Indexer {
    /// Create an indexer. `config.batch_size` controls the batch length.
    pub fn new(
        config: RagConfig,
        chunker: Arc<dyn Chunker>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { config, chunker, embedding_provider, vector_store }
    }

    /// Chunk every document, in order, into one flat sequence.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            let document_chunks = self.chunker.chunk(document);
            if document_chunks.is_empty() {
                debug!(source_id = %document.source_id, "document produced no chunks");
            }
            chunks.extend(document_chunks);
        }
        chunks
    }

    /// Index `documents` into the current collection.
    ///
    /// Ids start at zero, so this expects an empty collection; use
    /// [`rebuild`](Self::rebuild) to get one.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::BatchFailed`] naming the id range of the first batch
    /// whose embedding or upsert failed. Earlier batches stay in the store but
    /// are not flushed.
    pub async fn index(&self, documents: &[Document]) -> Result<IndexReport> {
        let chunks = self.chunk_documents(documents);
        let mut report = self.write_batches(&chunks).await?;
        report.documents = documents.len();
        info!(
            documents = report.documents,
            chunks = report.chunks,
            batches = report.batches,
            "indexing complete"
        );
        Ok(report)
    }

    /// Index pre-chunked records, keeping their order.
    ///
    /// # Errors
    ///
    /// Same as [`index`](Self::index).
    pub async fn index_chunks(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        let mut report = self.write_batches(chunks).await?;
        report.documents = chunks.iter().map(|c| c.source_id.as_str()).collect::<HashSet<_>>().len();
        info!(chunks = report.chunks, batches = report.batches, "indexing complete");
        Ok(report)
    }

    /// Drop and recreate the collection, then index `documents`.
    ///
    /// If any batch fails, the collection is recreated again so no partial
    /// index is left behind, and the failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`VectorStore::recreate`] error or [`RagError::BatchFailed`].
    pub async fn rebuild(&self, documents: &[Document]) -> Result<IndexReport> {
        self.recreate().await?;
        let outcome = self.index(documents).await;
        self.discard_on_failure(outcome).await
    }

    /// Drop and recreate the collection, then index pre-chunked records.
    ///
    /// # Errors
    ///
    /// Same as [`rebuild`](Self::rebuild).
    pub async fn rebuild_chunks(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        self.recreate().await?;
        let outcome = self.index_chunks(chunks).await;
        self.discard_on_failure(outcome).await
    }

    async fn recreate(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.recreate(dimensions).await.map_err(|e| {
            error!(backend = self.vector_store.backend(), error = %e, "failed to recreate collection");
            e
        })
    }

    async fn discard_on_failure(&self, outcome: Result<IndexReport>) -> Result<IndexReport> {
        if outcome.is_err() {
            let dimensions = self.embedding_provider.dimensions();
            if let Err(e) = self.vector_store.recreate(dimensions).await {
                warn!(error = %e, "failed to discard partially written collection");
            } else {
                warn!("discarded partially written collection");
            }
        }
        outcome
    }

    async fn write_batches(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        let batch_size = self.config.batch_size.max(1);
        let mut report = IndexReport { chunks: chunks.len(), ..IndexReport::default() };

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            let first_id = (batch_index * batch_size) as u64;
            let last_id = first_id + batch.len() as u64 - 1;

            let written = self.write_batch(first_id, batch).await.map_err(|e| {
                error!(first_id, last_id, error = %e, "batch failed, aborting indexing run");
                RagError::BatchFailed { first_id, last_id, source: Box::new(e) }
            })?;

            report.batches += 1;
            report.records_written += written;
            info!(first_id, last_id, total = chunks.len(), "indexed batch");
        }

        self.vector_store.flush().await.map_err(|e| {
            error!(backend = self.vector_store.backend(), error = %e, "failed to commit index");
            e
        })?;
        Ok(report)
    }

    /// Embed one batch, then upsert it. Returns the number of records written.
    async fn write_batch(&self, first_id: u64, batch: &[Chunk]) -> Result<usize> {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await?;

        if embeddings.len() != batch.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.name().to_string(),
                message: format!(
                    "returned {} embeddings for {} texts",
                    embeddings.len(),
                    batch.len()
                ),
            });
        }

        let records: Vec<IndexRecord> = batch
            .iter()
            .zip(embeddings)
            .zip(first_id..)
            .map(|((chunk, embedding), chunk_id)| IndexRecord {
                chunk_id,
                embedding,
                text: chunk.text.clone(),
                source_id: chunk.source_id.clone(),
            })
            .collect();

        self.vector_store.upsert_batch(&records).await?;
        Ok(records.len())
    }
}

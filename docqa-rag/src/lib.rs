//! Retrieval-augmented question answering over a document corpus.
//!
//! This crate provides:
//! - Recursive, overlap-aware text chunking
//! - Batched indexing (one embedding call and one upsert per batch)
//! - Nearest-neighbour retrieval with source attribution
//! - Grounded prompt assembly and answer generation
//!
//! Providers sit behind the [`EmbeddingProvider`], [`VectorStore`] and
//! [`GenerativeModel`] traits. The Gemini REST adapters live behind the
//! `gemini` feature and the Qdrant store behind `qdrant`.

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filestore;
pub mod generation;
pub mod indexer;
pub mod inmemory;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use answer::AnswerAssembler;
pub use chunking::{Chunker, RecursiveChunker, split_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, Document, IndexRecord, QueryMatch, RetrievalContext};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use filestore::JsonFileVectorStore;
pub use generation::GenerativeModel;
pub use indexer::{IndexReport, Indexer};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{QaPipeline, QaPipelineBuilder};
pub use retriever::{CONTEXT_SEPARATOR, Retriever};
pub use vectorstore::VectorStore;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, GeminiModel};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;

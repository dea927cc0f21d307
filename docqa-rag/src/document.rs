//! Data types for documents, chunks, index records and retrieval results.

use serde::{Deserialize, Serialize};

/// A source document: a stable identifier plus its extracted plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Stable short identifier shown as provenance (e.g. a file name).
    pub source_id: String,
    /// The extracted text. May be empty when extraction produced nothing.
    pub text: String,
}

impl Document {
    /// Create a document from an identifier and its text.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), text: text.into() }
    }
}

/// A bounded, contiguous slice of one [`Document`]'s text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The `source_id` of the originating document.
    pub source_id: String,
    /// Position of this chunk within its document's chunk stream.
    pub sequence_index: usize,
    /// The chunk text.
    pub text: String,
    /// Character offset of the chunk's first character in the document text.
    pub start_offset: usize,
}

/// The persisted form of a [`Chunk`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    /// Global position of the chunk in the ingestion sequence.
    pub chunk_id: u64,
    /// The embedding of `text`.
    pub embedding: Vec<f32>,
    /// The chunk text.
    pub text: String,
    /// The originating document.
    pub source_id: String,
}

/// One nearest-neighbour hit returned by a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryMatch {
    /// The id of the matched record.
    pub chunk_id: u64,
    /// The matched chunk text.
    pub text: String,
    /// The originating document.
    pub source_id: String,
    /// Distance to the query vector (lower is closer).
    pub distance: f32,
}

/// The passages retrieved for one question.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalContext {
    /// Chunk texts in rank order joined by a visible separator.
    pub text: String,
    /// Distinct source ids of the matches, in first-seen order.
    pub sources: Vec<String>,
    /// The raw matches in rank order.
    pub matches: Vec<QueryMatch>,
}

impl RetrievalContext {
    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// A generated answer together with the documents it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// The model's text, verbatim.
    pub text: String,
    /// Distinct source ids from the retrieval context.
    pub sources: Vec<String>,
}

//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `BTreeMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small corpora that are rebuilt on start.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexRecord, QueryMatch};
use crate::error::Result;
use crate::vectorstore::{VectorStore, check_query_dimensions, nearest};

/// An in-memory vector store ranking records by cosine distance.
///
/// Records are keyed by `chunk_id`, so iteration order (and therefore tie
/// breaking) is deterministic.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.recreate(64).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<BTreeMap<u64, IndexRecord>>,
    /// Set by `recreate`; zero until then.
    dimensions: RwLock<usize>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record in `chunk_id` order.
    pub async fn records(&self) -> Vec<IndexRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn recreate(&self, dimensions: usize) -> Result<()> {
        self.records.write().await.clear();
        *self.dimensions.write().await = dimensions;
        Ok(())
    }

    async fn upsert_batch(&self, records: &[IndexRecord]) -> Result<()> {
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.chunk_id, record.clone());
        }
        Ok(())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        check_query_dimensions(*self.dimensions.read().await, embedding)?;
        let store = self.records.read().await;
        Ok(nearest(store.values(), embedding, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    fn backend(&self) -> &str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    #[tokio::test]
    async fn query_of_wrong_dimensionality_is_rejected() {
        let store = InMemoryVectorStore::new();
        store.recreate(2).await.unwrap();
        store
            .upsert_batch(&[IndexRecord {
                chunk_id: 0,
                embedding: vec![1.0, 0.0],
                text: "apple".into(),
                source_id: "a.html".into(),
            }])
            .await
            .unwrap();

        assert_eq!(store.query_nearest(&[1.0, 0.0], 1).await.unwrap().len(), 1);
        let err = store.query_nearest(&[1.0; 4], 1).await.unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }
}

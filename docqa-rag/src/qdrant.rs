//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] for one
//! Qdrant collection using the [qdrant-client](https://docs.rs/qdrant-client)
//! crate over gRPC.
//!
//! This module is only available when the `qdrant` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", "docs")?;
//! store.recreate(768).await?;
//! store.upsert_batch(&records).await?;
//! let matches = store.query_nearest(&query_embedding, 5).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::debug;

use crate::document::{IndexRecord, QueryMatch};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

/// A [`VectorStore`] backed by a [Qdrant](https://qdrant.tech/) collection.
///
/// Collections use cosine distance; Qdrant reports a similarity score, which
/// is mapped to `distance = 1 - score`. The chunk text and `source_id` are
/// stored as payload and `chunk_id` is the numeric point id.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store for `collection` at the given URL.
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client, collection: collection.into() })
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant, collection: impl Into<String>) -> Self {
        Self { client, collection: collection.into() }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: "qdrant".to_string(), message: e.to_string() }
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn recreate(&self, dimensions: usize) -> Result<()> {
        let name = self.collection.as_str();
        if self.client.collection_exists(name).await.map_err(Self::map_err)? {
            self.client.delete_collection(name).await.map_err(Self::map_err)?;
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "recreated qdrant collection");
        Ok(())
    }

    async fn upsert_batch(&self, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| {
                let payload =
                    Payload::try_from(json!({ "text": record.text, "source_id": record.source_id }))
                        .map_err(|e| RagError::VectorStoreError {
                            backend: "qdrant".to_string(),
                            message: format!("invalid payload for {}: {e}", record.chunk_id),
                        })?;
                Ok(PointStruct::new(record.chunk_id, record.embedding.clone(), payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.collection, count = records.len(), "upserted records to qdrant");
        Ok(())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection.as_str(), embedding.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let mut matches: Vec<QueryMatch> = response
            .result
            .into_iter()
            .map(|scored| {
                let chunk_id = scored
                    .id
                    .as_ref()
                    .and_then(|pid| match &pid.point_id_options {
                        Some(PointIdOptions::Num(n)) => Some(*n),
                        Some(PointIdOptions::Uuid(_)) | None => None,
                    })
                    .unwrap_or_default();
                let text =
                    scored.payload.get("text").and_then(Self::extract_string).unwrap_or_default();
                let source_id = scored
                    .payload
                    .get("source_id")
                    .and_then(Self::extract_string)
                    .unwrap_or_default();

                QueryMatch { chunk_id, text, source_id, distance: 1.0 - scored.score }
            })
            .collect();

        matches.sort_by(rank);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection.as_str()).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map_or(0, |r| r.count as usize))
    }

    fn backend(&self) -> &str {
        "qdrant"
    }
}

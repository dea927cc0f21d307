//! Vector store trait for persisting records and nearest-neighbour search.

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::document::{IndexRecord, QueryMatch};
use crate::error::{RagError, Result};

/// A storage backend for one collection of embedded chunks.
///
/// The store exclusively owns the persisted [`IndexRecord`]s; callers only go
/// through this interface. A rebuild is `recreate` followed by upserts and a
/// final `flush`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.recreate(768).await?;
/// store.upsert_batch(&records).await?;
/// let matches = store.query_nearest(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drop the collection (if any) and create it empty.
    async fn recreate(&self, dimensions: usize) -> Result<()>;

    /// Insert or replace records, keyed by `chunk_id`.
    async fn upsert_batch(&self, records: &[IndexRecord]) -> Result<()>;

    /// Return up to `k` records nearest to `embedding`, ordered by ascending
    /// distance. Ties are broken by ascending `chunk_id`.
    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryMatch>>;

    /// Number of records in the collection.
    async fn count(&self) -> Result<usize>;

    /// Commit everything written since the last `recreate` or `flush`.
    ///
    /// Stores that write through on every call keep the default no-op.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Short backend name used in logs and errors.
    fn backend(&self) -> &str;
}

/// Cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Returns `1.0` if either vector has zero magnitude.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Rank `records` against `embedding` and keep the `k` nearest.
pub(crate) fn nearest<'a>(
    records: impl Iterator<Item = &'a IndexRecord>,
    embedding: &[f32],
    k: usize,
) -> Vec<QueryMatch> {
    let mut scored: Vec<QueryMatch> = records
        .map(|record| QueryMatch {
            chunk_id: record.chunk_id,
            text: record.text.clone(),
            source_id: record.source_id.clone(),
            distance: cosine_distance(&record.embedding, embedding),
        })
        .collect();

    scored.sort_by(rank);
    scored.truncate(k);
    scored
}

/// Total order on matches: ascending distance with NaN last, then ascending
/// `chunk_id`.
pub(crate) fn rank(a: &QueryMatch, b: &QueryMatch) -> Ordering {
    a.distance
        .is_nan()
        .cmp(&b.distance.is_nan())
        .then_with(|| a.distance.total_cmp(&b.distance))
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

/// Reject a query vector whose length differs from the collection's.
///
/// `expected == 0` means the collection has no fixed dimensionality yet.
pub(crate) fn check_query_dimensions(expected: usize, embedding: &[f32]) -> Result<()> {
    if expected != 0 && embedding.len() != expected {
        return Err(RagError::ConfigError(format!(
            "query embedding has {} dimensions but the index holds {expected}-dimensional \
             vectors; query with the embedder the index was built with",
            embedding.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_have_distance_two() {
        let d = cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_maximally_uninformative() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    fn record(chunk_id: u64, embedding: Vec<f32>) -> IndexRecord {
        IndexRecord { chunk_id, embedding, text: format!("chunk {chunk_id}"), source_id: "s".into() }
    }

    #[test]
    fn non_finite_embeddings_rank_last_without_panicking() {
        let records = vec![
            record(0, vec![f32::INFINITY, 0.0]),
            record(1, vec![0.0, 1.0]),
            record(2, vec![f32::NAN, f32::NAN]),
            record(3, vec![1.0, 0.0]),
        ];
        let matches = nearest(records.iter(), &[1.0, 0.0], 4);
        let ids: Vec<u64> = matches.iter().map(|m| m.chunk_id).collect();
        assert_eq!(&ids[..2], &[3, 1]);
        assert!(matches[2..].iter().all(|m| m.distance.is_nan()));
    }

    #[test]
    fn query_dimensions_must_match_collection() {
        assert!(check_query_dimensions(0, &[1.0; 5]).is_ok());
        assert!(check_query_dimensions(3, &[1.0; 3]).is_ok());
        let err = check_query_dimensions(64, &[1.0; 768]).unwrap_err();
        assert!(matches!(&err, RagError::ConfigError(msg) if msg.contains("768") && msg.contains("64")));
    }

    #[test]
    fn ties_are_broken_by_chunk_id() {
        let records = vec![record(7, vec![1.0, 0.0]), record(3, vec![1.0, 0.0])];
        let matches = nearest(records.iter(), &[1.0, 0.0], 2);
        assert_eq!(matches.iter().map(|m| m.chunk_id).collect::<Vec<_>>(), vec![3, 7]);
    }
}

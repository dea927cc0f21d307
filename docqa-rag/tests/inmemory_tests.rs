//! Property tests for in-memory vector store search ordering.

use std::collections::BTreeMap;

use docqa_rag::document::IndexRecord;
use docqa_rag::inmemory::InMemoryVectorStore;
use docqa_rag::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// Generate a record with a normalized embedding.
fn arb_record(dim: usize) -> impl Strategy<Value = IndexRecord> {
    (0u64..64, "[a-z ]{5,30}", "[a-z]{1,6}\\.html", arb_normalized_embedding(dim)).prop_map(
        |(chunk_id, text, source_id, embedding)| IndexRecord {
            chunk_id,
            embedding,
            text,
            source_id,
        },
    )
}

/// Nearest-neighbour results come back closest first, ties broken by
/// ascending `chunk_id`, and never more than `k` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_ascending_and_bounded_by_k(
            records in proptest::collection::vec(arb_record(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.recreate(DIM).await.unwrap();

                // Later upserts with the same id replace earlier ones
                let unique: BTreeMap<u64, IndexRecord> =
                    records.iter().map(|r| (r.chunk_id, r.clone())).collect();
                let unique: Vec<IndexRecord> = unique.into_values().collect();

                store.upsert_batch(&unique).await.unwrap();
                let results = store.query_nearest(&query, k).await.unwrap();
                (results, unique.len())
            });

            prop_assert_eq!(results.len(), k.min(unique_count));

            for window in results.windows(2) {
                let ordered = window[0].distance < window[1].distance
                    || (window[0].distance == window[1].distance
                        && window[0].chunk_id < window[1].chunk_id);
                prop_assert!(
                    ordered,
                    "results not in ascending order: {} ({}) before {} ({})",
                    window[0].distance,
                    window[0].chunk_id,
                    window[1].distance,
                    window[1].chunk_id,
                );
            }
        }
    }
}

/// Repeated identical queries rank identically.
mod prop_inmemory_determinism {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn repeated_queries_return_same_ranking(
            records in proptest::collection::vec(arb_record(DIM), 1..15),
            query in arb_normalized_embedding(DIM),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (first, second) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.upsert_batch(&records).await.unwrap();
                let first = store.query_nearest(&query, 5).await.unwrap();
                let second = store.query_nearest(&query, 5).await.unwrap();
                (first, second)
            });

            let first_ids: Vec<u64> = first.iter().map(|m| m.chunk_id).collect();
            let second_ids: Vec<u64> = second.iter().map(|m| m.chunk_id).collect();
            prop_assert_eq!(first_ids, second_ids);
        }
    }
}

//! Query-time retrieval: embed → nearest neighbours → context.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{QueryMatch, RetrievalContext};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Visible boundary placed between passages in the context text.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Fetches the passages nearest to a question.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Create a retriever over the given provider and store.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { embedding_provider, vector_store }
    }

    /// Retrieve the `k` nearest chunks for `query`.
    ///
    /// A corpus smaller than `k` yields fewer matches; an empty corpus yields
    /// an empty context. Neither is an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `k == 0`, or the provider/store
    /// error if embedding or search fails.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalContext> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be at least 1".to_string()));
        }

        let embedding = self.embedding_provider.embed(query).await?;
        let matches = self.vector_store.query_nearest(&embedding, k).await?;
        debug!(k, returned = matches.len(), "nearest chunks fetched");

        let context = build_context(matches);
        info!(matches = context.matches.len(), sources = context.sources.len(), "retrieval complete");
        Ok(context)
    }
}

/// Join match texts in rank order and collect distinct sources in first-seen
/// order.
pub fn build_context(matches: Vec<QueryMatch>) -> RetrievalContext {
    let text = matches.iter().map(|m| m.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);

    let mut seen = HashSet::new();
    let sources = matches
        .iter()
        .filter(|m| seen.insert(m.source_id.as_str()))
        .map(|m| m.source_id.clone())
        .collect();

    RetrievalContext { text, sources, matches }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(chunk_id: u64, source_id: &str, text: &str) -> QueryMatch {
        QueryMatch { chunk_id, text: text.into(), source_id: source_id.into(), distance: 0.1 }
    }

    #[test]
    fn sources_are_deduplicated_in_first_seen_order() {
        let context = build_context(vec![
            hit(4, "b.html", "beta"),
            hit(1, "a.html", "alpha"),
            hit(5, "b.html", "beta two"),
            hit(9, "c.html", "gamma"),
        ]);

        assert_eq!(context.sources, vec!["b.html", "a.html", "c.html"]);
        assert_eq!(context.text, "beta\n\n---\n\nalpha\n\n---\n\nbeta two\n\n---\n\ngamma");
        assert_eq!(context.matches.len(), 4);
    }

    #[test]
    fn no_matches_give_empty_context() {
        let context = build_context(Vec::new());
        assert!(context.is_empty());
        assert!(context.text.is_empty());
        assert!(context.sources.is_empty());
    }

    #[test]
    fn single_match_has_no_separator() {
        let context = build_context(vec![hit(0, "a.html", "apple banana")]);
        assert_eq!(context.text, "apple banana");
        assert_eq!(context.sources, vec!["a.html"]);
    }
}

//! Persistent vector store backed by a JSON file per collection.
//!
//! [`JsonFileVectorStore`] keeps the collection in memory for search.
//! `recreate` and `upsert_batch` only touch memory; [`VectorStore::flush`]
//! writes `<dir>/<collection>.json` once per indexing run. The file is written
//! to a temporary path and renamed into place, so an aborted run or a crash
//! mid-write leaves the last committed index intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{IndexRecord, QueryMatch};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, check_query_dimensions, nearest};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    dimensions: usize,
    records: Vec<IndexRecord>,
}

#[derive(Debug, Default)]
struct State {
    dimensions: usize,
    records: BTreeMap<u64, IndexRecord>,
}

/// A [`VectorStore`] that survives process restarts.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::JsonFileVectorStore;
///
/// // ingestion: create the directory if needed
/// let store = JsonFileVectorStore::open("docqa_index", "docs")?;
/// // query time: fail fast if nothing was ingested yet
/// let store = JsonFileVectorStore::open_existing("docqa_index", "docs")?;
/// ```
#[derive(Debug)]
pub struct JsonFileVectorStore {
    path: PathBuf,
    state: RwLock<State>,
}

impl JsonFileVectorStore {
    /// Open the collection, creating the directory if needed. A missing
    /// collection file yields an empty store that is written on first flush.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error if an existing file cannot be read.
    pub fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = Self::collection_path(dir, collection);

        let state = if path.exists() { Self::load(&path)? } else { State::default() };
        debug!(path = %path.display(), records = state.records.len(), "opened json vector store");
        Ok(Self { path, state: RwLock::new(state) })
    }

    /// Open a collection that must already exist on disk.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the collection file is missing.
    pub fn open_existing(dir: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let path = Self::collection_path(dir.as_ref(), collection);
        if !path.is_file() {
            return Err(RagError::ConfigError(format!(
                "index '{collection}' not found at {}; run ingestion first",
                path.display()
            )));
        }
        let state = Self::load(&path)?;
        Ok(Self { path, state: RwLock::new(state) })
    }

    /// Location of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn collection_path(dir: &Path, collection: &str) -> PathBuf {
        dir.join(format!("{collection}.json"))
    }

    fn load(path: &Path) -> Result<State> {
        let raw = std::fs::read_to_string(path)?;
        let file: CollectionFile = serde_json::from_str(&raw)?;
        Ok(State {
            dimensions: file.dimensions,
            records: file.records.into_iter().map(|r| (r.chunk_id, r)).collect(),
        })
    }

    async fn persist(&self, state: &State) -> Result<()> {
        let file = CollectionFile {
            dimensions: state.dimensions,
            records: state.records.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn check_dimensions(state: &State, records: &[IndexRecord]) -> Result<()> {
        if state.dimensions == 0 {
            return Ok(());
        }
        match records.iter().find(|r| r.embedding.len() != state.dimensions) {
            Some(bad) => Err(RagError::VectorStoreError {
                backend: "JsonFile".to_string(),
                message: format!(
                    "record {} has {} dimensions, collection expects {}",
                    bad.chunk_id,
                    bad.embedding.len(),
                    state.dimensions
                ),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for JsonFileVectorStore {
    async fn recreate(&self, dimensions: usize) -> Result<()> {
        let mut state = self.state.write().await;
        *state = State { dimensions, records: BTreeMap::new() };
        debug!(path = %self.path.display(), dimensions, "recreated json collection");
        Ok(())
    }

    async fn upsert_batch(&self, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().await;
        Self::check_dimensions(&state, records)?;
        for record in records {
            state.records.insert(record.chunk_id, record.clone());
        }
        debug!(count = records.len(), total = state.records.len(), "buffered records");
        Ok(())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        let state = self.state.read().await;
        check_query_dimensions(state.dimensions, embedding)?;
        Ok(nearest(state.records.values(), embedding, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.read().await.records.len())
    }

    async fn flush(&self) -> Result<()> {
        let state = self.state.read().await;
        self.persist(&state).await?;
        debug!(path = %self.path.display(), records = state.records.len(), "committed collection");
        Ok(())
    }

    fn backend(&self) -> &str {
        "JsonFile"
    }
}

//! Document sources: directories of text files and chunk record files.
//!
//! A chunk record file is a JSON array of `{"text": ..., "source": ...}`
//! objects, the shape produced by an external extraction step or by
//! [`write_chunks`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// One entry of a chunk record file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    /// The chunk text.
    pub text: String,
    /// Identifier of the originating document, usually its file name.
    pub source: String,
    /// Character offset in the source document, when known.
    #[serde(default)]
    pub start_offset: usize,
}

/// Load every file under `root` whose extension is in `extensions` as a
/// [`Document`], in sorted path order.
///
/// The `source_id` is the file name. An empty `extensions` slice accepts every
/// file. Files that cannot be read as UTF-8 text are skipped with a warning.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `root` is not a directory.
pub async fn load_directory(root: impl AsRef<Path>, extensions: &[&str]) -> Result<Vec<Document>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(RagError::ConfigError(format!(
            "document directory not found: {}",
            root.display()
        )));
    }

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matches_extension(entry.path(), extensions))
        .map(|entry| entry.into_path())
        .collect::<Vec<PathBuf>>();
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let source_id = source_id_for(&path);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(source_id = %source_id, chars = text.chars().count(), "loaded document");
                documents.push(Document::new(source_id, text));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
        }
    }

    info!(root = %root.display(), documents = documents.len(), "loaded document directory");
    Ok(documents)
}

/// Load a single file as a [`Document`] whose `source_id` is the file name.
///
/// # Errors
///
/// Returns [`RagError::Io`] if the file cannot be read as UTF-8 text.
pub async fn load_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    Ok(Document::new(source_id_for(path), text))
}

fn source_id_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn matches_extension(path: &Path, extensions: &[&str]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

/// Read a chunk record file into [`Chunk`]s, keeping file order.
///
/// `sequence_index` is assigned per source in order of appearance.
///
/// # Errors
///
/// Returns [`RagError::Io`] or [`RagError::Serialization`] if the file cannot
/// be read or parsed.
pub async fn load_chunk_records(path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let records: Vec<ChunkRecord> = serde_json::from_slice(&bytes)?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let chunks: Vec<Chunk> = records
        .into_iter()
        .map(|record| {
            let position = positions.entry(record.source.clone()).or_insert(0);
            let chunk = Chunk {
                source_id: record.source,
                sequence_index: *position,
                text: record.text,
                start_offset: record.start_offset,
            };
            *position += 1;
            chunk
        })
        .collect();

    info!(path = %path.display(), chunks = chunks.len(), "loaded chunk records");
    Ok(chunks)
}

/// Write `chunks` as a chunk record file, pretty-printed.
///
/// # Errors
///
/// Returns [`RagError::Io`] if the file cannot be written.
pub async fn write_chunks(path: impl AsRef<Path>, chunks: &[Chunk]) -> Result<()> {
    let path = path.as_ref();
    let records: Vec<ChunkRecord> = chunks
        .iter()
        .map(|chunk| ChunkRecord {
            text: chunk.text.clone(),
            source: chunk.source_id.clone(),
            start_offset: chunk.start_offset,
        })
        .collect();

    let json = serde_json::to_vec_pretty(&records)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), chunks = records.len(), "wrote chunk records");
    Ok(())
}

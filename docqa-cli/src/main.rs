//! `docqa`: ingest a documentation corpus and answer questions about it.
//!
//! # Usage
//!
//! ```bash
//! # Build the index from a directory of pages
//! GOOGLE_API_KEY=xxx docqa ingest --docs ./manual
//!
//! # Or from pre-extracted chunk records
//! docqa ingest --records chunks.json
//!
//! # Ask once, or start an interactive session
//! docqa ask "How do I add a modifier?"
//! docqa chat
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use docqa_rag::gemini::{GeminiEmbeddingProvider, GeminiModel};
use docqa_rag::loader::{load_chunk_records, load_directory, load_file, write_chunks};
use docqa_rag::{
    Answer, Chunker, EmbeddingProvider, HashEmbeddingProvider, JsonFileVectorStore, QaPipeline,
    RagConfig, RecursiveChunker, VectorStore,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, Embedder, IndexArgs};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = load_config(&cli.index)?;

    match cli.command {
        Command::Ingest { docs, records, extensions } => {
            ingest(&cli.index, config, docs.as_deref(), records.as_deref(), &extensions).await
        }
        Command::Chunk { input, output, extensions } => {
            chunk(&config, &input, &output, &extensions).await
        }
        Command::Ask { question, k } => {
            let pipeline = query_pipeline(&cli.index, config)?;
            let k = k.unwrap_or(pipeline.config().top_k);
            let answer = pipeline.ask_with_k(&question, k).await?;
            print_answer(&answer);
            Ok(())
        }
        Command::Chat { k } => {
            let pipeline = query_pipeline(&cli.index, config)?;
            let k = k.unwrap_or(pipeline.config().top_k);
            chat(&pipeline, k).await
        }
        Command::Count => {
            let store =
                JsonFileVectorStore::open_existing(&cli.index.index_dir, &cli.index.collection)?;
            println!("{}", store.count().await?);
            Ok(())
        }
    }
}

fn load_config(args: &IndexArgs) -> Result<RagConfig> {
    let config = match &args.config {
        Some(path) => RagConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RagConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn api_key(args: &IndexArgs) -> Result<&str> {
    match args.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("GOOGLE_API_KEY is not set; export it or pass --api-key"),
    }
}

fn embedding_provider(args: &IndexArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match args.embedder {
        Embedder::Gemini => Arc::new(GeminiEmbeddingProvider::new(api_key(args)?)?),
        Embedder::Hash => Arc::new(HashEmbeddingProvider::default()),
    })
}

/// Pipeline over an existing index with a generative model attached.
fn query_pipeline(args: &IndexArgs, config: RagConfig) -> Result<QaPipeline> {
    let model = GeminiModel::new(api_key(args)?)?;
    let embedder = embedding_provider(args)?;
    let store = JsonFileVectorStore::open_existing(&args.index_dir, &args.collection)?;

    Ok(QaPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(Arc::new(store))
        .generative_model(Arc::new(model))
        .build()?)
}

async fn ingest(
    args: &IndexArgs,
    config: RagConfig,
    docs: Option<&Path>,
    records: Option<&Path>,
    extensions: &[String],
) -> Result<()> {
    let embedder = embedding_provider(args)?;
    let store = JsonFileVectorStore::open(&args.index_dir, &args.collection)?;
    let path = store.path().to_path_buf();
    let pipeline = QaPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(Arc::new(store))
        .build()?;

    let report = match (docs, records) {
        (Some(dir), _) => {
            let extensions: Vec<&str> = extensions.iter().map(String::as_str).collect();
            let documents = load_directory(dir, &extensions).await?;
            pipeline.rebuild(&documents).await
        }
        (None, Some(file)) => {
            let chunks = load_chunk_records(file).await?;
            pipeline.rebuild_chunks(&chunks).await
        }
        (None, None) => bail!("either --docs or --records is required"),
    }
    .context("ingestion failed")?;

    info!(index = %path.display(), "index written");
    println!(
        "Indexed {} chunks from {} documents in {} batches.",
        report.records_written, report.documents, report.batches
    );
    Ok(())
}

async fn chunk(
    config: &RagConfig,
    input: &Path,
    output: &Path,
    extensions: &[String],
) -> Result<()> {
    let chunker = RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?;
    let documents = if input.is_file() {
        vec![load_file(input).await?]
    } else {
        let extensions: Vec<&str> = extensions.iter().map(String::as_str).collect();
        load_directory(input, &extensions).await?
    };

    let chunks: Vec<_> = documents.iter().flat_map(|d| chunker.chunk(d)).collect();
    write_chunks(output, &chunks).await?;
    println!(
        "Wrote {} chunks from {} documents to {}.",
        chunks.len(),
        documents.len(),
        output.display()
    );
    Ok(())
}

async fn chat(pipeline: &QaPipeline, k: usize) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question about the documentation. Ctrl-D to quit.");

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        remember(editor.history_mut(), question)?;

        match pipeline.ask_with_k(question, k).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

fn remember(history: &mut impl History, question: &str) -> Result<()> {
    history.add(question).context("failed to record question in history")?;
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text.trim());
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!("  - {source}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::MemHistory;

    #[test]
    fn asked_questions_land_in_history() {
        let mut history = MemHistory::new();
        remember(&mut history, "how do I grab?").unwrap();
        remember(&mut history, "how do I rotate?").unwrap();
        assert_eq!(history.len(), 2);
    }
}

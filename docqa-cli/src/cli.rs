//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ingest a documentation corpus and answer questions about it.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub index: IndexArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the index lives and how it is built.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Directory holding persisted collections.
    #[arg(long, global = true, env = "DOCQA_INDEX_DIR", default_value = "docqa_index")]
    pub index_dir: PathBuf,

    /// Collection name inside the index directory.
    #[arg(long, global = true, env = "DOCQA_COLLECTION", default_value = "docs")]
    pub collection: String,

    /// JSON file with chunk_size, chunk_overlap, batch_size and top_k.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Embedding backend.
    #[arg(
        long,
        global = true,
        env = "DOCQA_EMBEDDER",
        value_enum,
        default_value_t = Embedder::Gemini
    )]
    pub embedder: Embedder,

    /// Gemini API key.
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Embedder {
    /// Gemini `text-embedding-004`.
    Gemini,
    /// Offline hash embeddings, for dry runs without credentials.
    Hash,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rebuild the index from a document directory or a chunk record file.
    Ingest {
        /// Directory of documents to chunk and index.
        #[arg(long, conflicts_with = "records", required_unless_present = "records")]
        docs: Option<PathBuf>,

        /// JSON file of pre-chunked `{"text", "source"}` records.
        #[arg(long)]
        records: Option<PathBuf>,

        /// File extensions to load from the document directory.
        #[arg(long = "ext", value_delimiter = ',', default_value = "html,htm,md,txt")]
        extensions: Vec<String>,
    },

    /// Chunk a text file or a document directory into a chunk record file.
    Chunk {
        /// Text file, or directory of documents.
        #[arg(long)]
        input: PathBuf,

        /// Output JSON file.
        #[arg(long)]
        output: PathBuf,

        /// File extensions to load when `--input` is a directory.
        #[arg(long = "ext", value_delimiter = ',', default_value = "html,htm,md,txt")]
        extensions: Vec<String>,
    },

    /// Answer one question.
    Ask {
        /// The question.
        question: String,

        /// Number of passages to retrieve.
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer questions interactively until EOF.
    Chat {
        /// Number of passages to retrieve.
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Print the number of indexed chunks.
    Count,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_accepts_extension_list() {
        let cli = Cli::try_parse_from([
            "docqa", "--embedder", "hash", "ingest", "--docs", "site", "--ext", "html,md",
        ])
        .unwrap();

        assert_eq!(cli.index.embedder, Embedder::Hash);
        match cli.command {
            Command::Ingest { docs, records, extensions } => {
                assert_eq!(docs, Some(PathBuf::from("site")));
                assert!(records.is_none());
                assert_eq!(extensions, vec!["html", "md"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ingest_requires_a_source() {
        assert!(Cli::try_parse_from(["docqa", "ingest"]).is_err());
        assert!(
            Cli::try_parse_from(["docqa", "ingest", "--docs", "a", "--records", "b.json"]).is_err()
        );
    }

    #[test]
    fn ask_takes_question_and_k() {
        let cli = Cli::try_parse_from(["docqa", "ask", "How do I grab?", "-k", "3"]).unwrap();
        match cli.command {
            Command::Ask { question, k } => {
                assert_eq!(question, "How do I grab?");
                assert_eq!(k, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

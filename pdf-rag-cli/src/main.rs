mod telemetry;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pdf_rag::{RagConfig, RagPipeline, SledVectorStore, VectorStore};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pdf-rag", about = "Ask questions about your PDF documents", version)]
struct Cli {
    /// Directory holding the vector index (overrides PERSIST_DIR)
    #[arg(long, global = true)]
    persist_dir: Option<PathBuf>,

    /// Emit logs and command output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, chunk and index a PDF into a collection
    Ingest {
        /// Path to the PDF file
        #[arg(long)]
        pdf_path: PathBuf,
        /// Target collection
        #[arg(long)]
        collection_name: String,
        /// Maximum characters per passage
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Characters shared by consecutive passages
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Answer a question from an indexed collection
    Ask {
        /// Collection to search
        #[arg(long)]
        collection_name: String,
        /// The question
        #[arg(long)]
        question: String,
        /// Number of passages to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List collections and their passage counts
    Collections,

    /// Delete a collection
    Drop {
        /// Collection to delete
        #[arg(long)]
        collection_name: String,
    },
}

#[derive(Serialize)]
struct IngestReport<'a> {
    collection: &'a str,
    pdf_path: String,
    passages: usize,
}

#[derive(Serialize)]
struct AnswerReport<'a> {
    collection: &'a str,
    question: &'a str,
    answer: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct CollectionSummary {
    name: String,
    passages: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json);

    if let Command::Ask { question, .. } = &cli.command {
        if question.trim().is_empty() {
            bail!("question must not be empty");
        }
    }

    let mut config = RagConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = &cli.persist_dir {
        config.persist_dir = dir.clone();
    }
    let persist_dir = config.persist_dir.clone();

    if !needs_pipeline(&cli.command) {
        let store = SledVectorStore::open(&persist_dir)
            .with_context(|| format!("failed to open index at {}", persist_dir.display()))?;
        return run_store(&store, cli.command, cli.json).await;
    }

    let pipeline = RagPipeline::from_config(config)
        .with_context(|| format!("failed to open index at {}", persist_dir.display()))?;

    run_pipeline(&pipeline, cli.command, cli.json).await
}

/// Whether the command embeds text. Management commands only need the store.
fn needs_pipeline(command: &Command) -> bool {
    matches!(command, Command::Ingest { .. } | Command::Ask { .. })
}

async fn run_pipeline(pipeline: &RagPipeline, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Ingest { pdf_path, collection_name, chunk_size, chunk_overlap } => {
            let chunk_size = chunk_size.unwrap_or(pipeline.config().chunk_size);
            let chunk_overlap = chunk_overlap.unwrap_or(pipeline.config().chunk_overlap);

            let passages = pipeline
                .ingest(&pdf_path, &collection_name, chunk_size, chunk_overlap)
                .await
                .with_context(|| format!("failed to ingest {}", pdf_path.display()))?;

            let report = IngestReport {
                collection: &collection_name,
                pdf_path: pdf_path.display().to_string(),
                passages,
            };
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else if passages == 0 {
                println!("No text found in {}; nothing was stored.", report.pdf_path);
            } else {
                println!("Stored {passages} passages in collection '{collection_name}'.");
            }
        }

        Command::Ask { collection_name, question, top_k } => {
            let top_k = top_k.unwrap_or(pipeline.config().top_k);
            let answer = pipeline
                .answer(&collection_name, question.trim(), top_k)
                .await
                .with_context(|| format!("failed to answer from '{collection_name}'"))?;

            if json {
                let report =
                    AnswerReport { collection: &collection_name, question: &question, answer };
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("{answer}");
            }
        }

        Command::Collections | Command::Drop { .. } => {
            run_store(pipeline.vector_store().as_ref(), command, json).await?;
        }
    }

    Ok(())
}

async fn run_store(store: &dyn VectorStore, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Collections => {
            let summaries = collection_summaries(store).await?;
            if json {
                println!("{}", serde_json::to_string(&summaries)?);
            } else if summaries.is_empty() {
                println!("No collections.");
            } else {
                for summary in &summaries {
                    println!("{}\t{}", summary.name, summary.passages);
                }
            }
        }

        Command::Drop { collection_name } => {
            store
                .delete_collection(&collection_name)
                .await
                .with_context(|| format!("failed to delete '{collection_name}'"))?;
            info!(collection = %collection_name, "collection dropped");
            if json {
                println!("{}", serde_json::json!({ "deleted": collection_name }));
            } else {
                println!("Deleted collection '{collection_name}'.");
            }
        }

        Command::Ingest { .. } | Command::Ask { .. } => {
            bail!("this command needs the full pipeline");
        }
    }

    Ok(())
}

async fn collection_summaries(store: &dyn VectorStore) -> Result<Vec<CollectionSummary>> {
    let mut summaries = Vec::new();
    for name in store.list_collections().await.context("failed to list collections")? {
        let handle = store
            .open_or_create(&name)
            .await
            .with_context(|| format!("failed to open collection '{name}'"))?;
        let passages = store
            .count(&handle)
            .await
            .with_context(|| format!("failed to count passages in '{name}'"))?;
        summaries.push(CollectionSummary { name, passages });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ingest_with_chunk_overrides() {
        let cli = Cli::parse_from([
            "pdf-rag",
            "--persist-dir",
            "/tmp/index",
            "ingest",
            "--pdf-path",
            "handbook.pdf",
            "--collection-name",
            "handbook",
            "--chunk-size",
            "800",
        ]);
        assert_eq!(cli.persist_dir, Some(PathBuf::from("/tmp/index")));
        match cli.command {
            Command::Ingest { pdf_path, collection_name, chunk_size, chunk_overlap } => {
                assert_eq!(pdf_path, PathBuf::from("handbook.pdf"));
                assert_eq!(collection_name, "handbook");
                assert_eq!(chunk_size, Some(800));
                assert_eq!(chunk_overlap, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "pdf-rag",
            "ask",
            "--collection-name",
            "handbook",
            "--question",
            "What is the refund policy?",
            "--json",
        ]);
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Ask { top_k: None, .. }));
    }

    #[test]
    fn management_commands_skip_the_pipeline() {
        assert!(!needs_pipeline(&Command::Collections));
        assert!(!needs_pipeline(&Command::Drop { collection_name: "docs".into() }));
        assert!(needs_pipeline(&Command::Ask {
            collection_name: "docs".into(),
            question: "q".into(),
            top_k: None,
        }));
    }

    #[tokio::test]
    async fn collections_and_drop_work_on_the_store_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledVectorStore::open(dir.path()).unwrap();
        let handle = store.open_or_create("handbook").await.unwrap();
        store
            .add(&handle, &["p-0".to_string()], &["Refunds within 30 days.".to_string()], &[
                vec![1.0, 0.0],
            ])
            .await
            .unwrap();
        store.open_or_create("empty").await.unwrap();

        assert_eq!(collection_summaries(&store).await.unwrap(), vec![
            CollectionSummary { name: "empty".into(), passages: 0 },
            CollectionSummary { name: "handbook".into(), passages: 1 },
        ]);

        run_store(&store, Command::Drop { collection_name: "handbook".into() }, false)
            .await
            .unwrap();
        assert_eq!(store.list_collections().await.unwrap(), vec!["empty".to_string()]);
    }

    #[tokio::test]
    async fn store_runner_rejects_pipeline_commands() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledVectorStore::open(dir.path()).unwrap();
        let ask =
            Command::Ask { collection_name: "docs".into(), question: "q".into(), top_k: None };
        assert!(run_store(&store, ask, false).await.is_err());
    }

    #[test]
    fn ask_requires_a_question() {
        assert!(Cli::try_parse_from(["pdf-rag", "ask", "--collection-name", "handbook"]).is_err());
    }
}

//! CLI entry point for the kgrag knowledge importer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use kgrag_core::types::KnowledgeDocument;
use kgrag_core::KgragConfig;
use kgrag_graph::{GraphClient, GraphConfig};

use kgrag_ingest::{check_document, Loader};

#[derive(Parser)]
#[command(name = "kgrag-ingest")]
#[command(about = "Load a knowledge document into the kgrag graph")]
struct Cli {
    /// Config file prefix (default: kgrag).
    #[arg(short, long, default_value = "kgrag")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the graph contents with the given document.
    Import {
        /// Path to the JSON knowledge document.
        file: PathBuf,

        /// Skip lookup-index creation after the load.
        #[arg(long)]
        no_indexes: bool,
    },
    /// Validate a document without touching the graph.
    Check {
        /// Path to the JSON knowledge document.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Import { file, no_indexes } => {
            let config = KgragConfig::load(&cli.config)?;
            let graph = GraphClient::connect(&GraphConfig::from(&config.neo4j)).await?;
            tracing::info!(uri = %config.neo4j.uri, "Connected to Neo4j");

            let mut loader = Loader::new(graph);
            if no_indexes {
                loader = loader.without_indexes();
            }
            let report = loader.import_path(&file).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.is_complete() {
                tracing::warn!(
                    failures = report.failures.len(),
                    "Import finished with skipped records"
                );
            }
        }
        Command::Check { file } => {
            let bytes = tokio::fs::read(&file).await?;
            let (doc, warnings) = KnowledgeDocument::from_slice(&bytes)?;
            let check = check_document(&doc, warnings);
            println!("{}", serde_json::to_string_pretty(&check)?);

            if !check.is_clean() {
                anyhow::bail!("{} has problems that an import would skip", file.display());
            }
        }
    }

    Ok(())
}

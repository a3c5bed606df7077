//! CLI entry point for kgrag question answering.
//!
//! Designed for subprocess invocation: reads a JSON request from stdin or
//! arguments, writes a JSON result to stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use kgrag_core::KgragConfig;
use kgrag_graph::{GraphClient, GraphConfig};

use kgrag_answer::{
    views, AnswerEngine, OpenAiCompatibleClient, DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT,
};

#[derive(Parser)]
#[command(name = "kgrag-answer")]
#[command(about = "Answer questions from the kgrag knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: kgrag).
    #[arg(short, long, default_value = "kgrag", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question. Without an argument, reads `{"question": ...}` from stdin.
    Ask {
        question: Option<String>,

        /// Return the error instead of the fixed apology on failure.
        #[arg(long)]
        strict: bool,
    },
    /// Print a bounded snapshot of the graph.
    Snapshot,
    /// List entities.
    Entities {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
    /// Search entities by name or description.
    Search {
        term: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// Show one entity with its relations.
    Details { name: String },
    /// Print entity and relationship counts.
    Counts,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = KgragConfig::load(&cli.config)?;

    let graph = GraphClient::connect(&GraphConfig::from(&config.neo4j)).await?;

    match cli.command {
        Command::Ask { question, strict } => {
            let question = match question {
                Some(q) => q,
                None => {
                    let input = std::io::read_to_string(std::io::stdin())?;
                    serde_json::from_str::<AskRequest>(&input)?.question
                }
            };

            let model = OpenAiCompatibleClient::from_settings(&config.llm)?;
            let engine = AnswerEngine::new(graph, model)
                .with_retrieval(config.retrieval.clone())
                .with_generation(&config.llm);

            let answer = if strict {
                engine.answer_question(&question).await?
            } else {
                engine.answer_or_apologize(&question).await
            };
            println!("{}", serde_json::to_string(&answer)?);
        }
        Command::Snapshot => {
            let snapshot = views::snapshot(&graph, config.retrieval.snapshot_edge_limit).await?;
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        Command::Entities { limit } => {
            let entities = graph.list_entities(limit).await?;
            println!("{}", serde_json::to_string(&entities)?);
        }
        Command::Search { term, limit } => {
            let entities = graph.search_entities(&term, limit).await?;
            println!("{}", serde_json::to_string(&entities)?);
        }
        Command::Details { name } => {
            let details = graph
                .entity_details(&name)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Entity not found: {name}"))?;
            println!("{}", serde_json::to_string(&details)?);
        }
        Command::Counts => {
            let counts = graph.counts().await?;
            println!("{}", serde_json::to_string(&counts)?);
        }
    }

    Ok(())
}

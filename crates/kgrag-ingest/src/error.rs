//! Error types for the kgrag-ingest crate.
//!
//! Only failures that abort a whole import are errors. Records that cannot
//! be created are reported as `ItemFailure`s in the import report.

use thiserror::Error;

use kgrag_graph::GraphError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Graph store unreachable: {0}")]
    Connectivity(#[source] GraphError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Failed to parse knowledge document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Classify a store error, keeping connectivity failures distinct.
    pub(crate) fn from_store(e: GraphError) -> Self {
        if e.is_connectivity() {
            Self::Connectivity(e)
        } else {
            Self::Graph(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

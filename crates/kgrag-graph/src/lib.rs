//! kgrag-graph: Neo4j access for the knowledge graph.
//!
//! This crate is the single access point for the knowledge graph. The loader
//! and the retrieval pipeline talk to it through the [`KnowledgeStore`] trait;
//! [`GraphClient`] implements it against Neo4j and [`MemoryStore`] in memory.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError, GraphSession};
pub use memory::MemoryStore;
pub use store::{Direction, KnowledgeStore, LabelMode, NeighborRow};

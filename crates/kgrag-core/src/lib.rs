//! kgrag-core: Shared types, configuration, and error handling for kgrag.
//!
//! This crate provides the foundational types used across all kgrag components:
//! - Entity and relationship records and the import document format
//! - Retrieval context and answer types
//! - Import reports and graph snapshot views
//! - Structural label sanitization
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod label;
pub mod types;

pub use config::KgragConfig;
pub use error::KgragError;
pub use types::{
    Answer, Context, Entity, EntityDetails, GraphCounts, GraphSnapshot, ImportReport,
    KnowledgeDocument, RawRelationship, Relationship, RelationshipTriple,
};

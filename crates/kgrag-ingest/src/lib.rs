//! kgrag-ingest: Loads knowledge documents into the graph.
//!
//! Every import is a full replace: the store is cleared and rebuilt from
//! the document. [`check_document`] validates a document without writing.

pub mod check;
pub mod error;
pub mod loader;

pub use check::{check_document, DocumentCheck};
pub use error::{IngestError, Result};
pub use loader::Loader;

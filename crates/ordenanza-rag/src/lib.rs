//! Retrieval and table computation over municipal legal documents.
//!
//! A query is classified, narrowed by filters pulled from its text, and then
//! either ranked with BM25 over the document corpus or answered by exact
//! arithmetic over the structured tables extracted from the documents.

pub mod computation;
pub mod config;
pub mod error;
pub mod query;
pub mod retrieval;
pub mod search;
pub mod types;

// Re-export primary types for convenience
pub use config::EngineConfig;
pub use error::{ComputeError, ComputeErrorCode, EngineError, EngineResult};
pub use retrieval::{
    CorpusLoader, CorpusStats, InMemoryCorpus, LexicalResult, RetrievalOutcome, Retriever, TableLoader,
};
pub use types::{Document, DocumentStatus, DocumentType, SearchFilters, Source, StructuredTable, TypeFilter};

pub use computation::{ComputationEngine, ComputeAnswer};
pub use query::{Classification, QueryClassifier, QueryIntent};

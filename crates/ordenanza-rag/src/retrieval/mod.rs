//! Retrieval layer: snapshot cache, loader seams, excerpt assembly and the
//! query orchestrator.

pub mod cache;
pub mod context;
pub mod loader;
pub mod orchestrator;

pub use cache::{IndexCache, IndexSnapshot};
pub use context::{content_limit, format_excerpt, optimal_limit};
pub use loader::{CorpusLoader, InMemoryCorpus, TableLoader};
pub use orchestrator::{CorpusStats, LexicalResult, RetrievalOutcome, Retriever};

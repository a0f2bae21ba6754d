//! Query understanding: intent classification and filter extraction.

pub mod classifier;
pub mod filters;
pub mod vocabulary;

pub use classifier::{Classification, QueryClassifier, QueryIntent, QuerySignals};
pub use filters::{extract_document_type, extract_filters, extract_jurisdiction, extract_year, year_range};
pub use vocabulary::Vocabulary;

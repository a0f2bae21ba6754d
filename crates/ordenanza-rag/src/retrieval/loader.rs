//! Collaborator seams for corpus and table loading.
//!
//! Implementations live outside the engine (filesystem, object storage, a
//! database) and may fail for any reason, so they return `anyhow::Result`;
//! the orchestrator wraps failures into [`crate::error::EngineError`].

use crate::types::{Document, StructuredTable};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[async_trait]
pub trait CorpusLoader: Send + Sync {
    /// Every document in the corpus, metadata only. Order is the corpus
    /// order used to break ranking ties.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Full text of one document, `None` when it has none.
    async fn load_content(&self, doc: &Document) -> Result<Option<String>>;
}

#[async_trait]
pub trait TableLoader: Send + Sync {
    /// Structured tables extracted from one document.
    async fn load_tables(&self, doc: &Document) -> Result<Vec<StructuredTable>>;
}

/// Corpus held in memory. Serves both loader seams; documents can be
/// replaced wholesale to simulate a corpus update.
#[derive(Default)]
pub struct InMemoryCorpus {
    documents: RwLock<Vec<Document>>,
    contents: RwLock<HashMap<String, String>>,
    tables: RwLock<HashMap<String, Vec<StructuredTable>>>,
}

impl InMemoryCorpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
            ..Default::default()
        }
    }

    pub fn with_content(self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.contents.write().insert(id.into(), content.into());
        self
    }

    pub fn with_tables(self, id: impl Into<String>, tables: Vec<StructuredTable>) -> Self {
        self.tables.write().insert(id.into(), tables);
        self
    }

    pub fn replace_documents(&self, documents: Vec<Document>) {
        *self.documents.write() = documents;
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl CorpusLoader for InMemoryCorpus {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.documents.read().clone())
    }

    async fn load_content(&self, doc: &Document) -> Result<Option<String>> {
        if let Some(content) = self.contents.read().get(&doc.id) {
            return Ok(Some(content.clone()));
        }
        Ok(doc.content.clone())
    }
}

#[async_trait]
impl TableLoader for InMemoryCorpus {
    async fn load_tables(&self, doc: &Document) -> Result<Vec<StructuredTable>> {
        Ok(self.tables.read().get(&doc.id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentStatus, DocumentType};
    use chrono::NaiveDate;

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            jurisdiction: "Merlo".into(),
            document_type: DocumentType::Bulletin,
            official_number: id.into(),
            title: format!("Boletín {}", id),
            content: None,
            published_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            status: DocumentStatus::Unknown,
            source_url: String::new(),
            document_types: None,
        }
    }

    #[tokio::test]
    async fn test_in_memory_corpus() {
        let corpus = InMemoryCorpus::new(vec![doc("1"), doc("2")])
            .with_content("1", "Artículo 1")
            .with_tables(
                "2",
                vec![StructuredTable {
                    title: "Tasas".into(),
                    ..Default::default()
                }],
            );

        let docs = corpus.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(corpus.load_content(&docs[0]).await.unwrap().as_deref(), Some("Artículo 1"));
        assert_eq!(corpus.load_content(&docs[1]).await.unwrap(), None);
        assert!(corpus.load_tables(&docs[0]).await.unwrap().is_empty());
        assert_eq!(corpus.load_tables(&docs[1]).await.unwrap()[0].title, "Tasas");

        corpus.replace_documents(vec![doc("3")]);
        assert_eq!(corpus.len(), 1);
    }
}

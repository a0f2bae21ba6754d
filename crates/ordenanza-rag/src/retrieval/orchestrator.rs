//! Query pipeline: classify, merge filters, then rank documents or compute
//! over their tables.
//!
//! The [`Retriever`] owns the index cache and the table cache. Infrastructure
//! failures never reach the caller: they are logged and the query is answered
//! from an empty corpus.

use crate::computation::{tables_summary, tag_tables, ComputationEngine, ComputeAnswer};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::query::{Classification, QueryClassifier, QueryIntent};
use crate::retrieval::cache::{IndexCache, IndexSnapshot};
use crate::retrieval::context::{content_limit, format_excerpt, join_excerpts, optimal_limit};
use crate::retrieval::loader::{CorpusLoader, TableLoader};
use crate::search::bm25::{Bm25Params, ScoreExplanation};
use crate::search::tokenizer::{expand_synonyms, fold_accents, tokenize};
use crate::types::{Document, SearchFilters, Source, StructuredTable, TableSource};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use lru::LruCache;
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LexicalResult {
    pub excerpt_text: String,
    pub sources: Vec<Source>,
    /// Matches before the limit was applied.
    pub total_matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    /// Answered without touching the corpus.
    Direct {
        classification: Classification,
        reply: Option<String>,
    },
    Lexical {
        classification: Classification,
        filters: SearchFilters,
        result: LexicalResult,
    },
    Computational {
        classification: Classification,
        filters: SearchFilters,
        answer: ComputeAnswer,
        sources: Vec<Source>,
        tables_summary: String,
    },
}

impl RetrievalOutcome {
    pub fn classification(&self) -> &Classification {
        match self {
            Self::Direct { classification, .. }
            | Self::Lexical { classification, .. }
            | Self::Computational { classification, .. } => classification,
        }
    }

    pub fn sources(&self) -> &[Source] {
        match self {
            Self::Direct { .. } => &[],
            Self::Lexical { result, .. } => &result.sources,
            Self::Computational { sources, .. } => sources,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub total_documents: usize,
    /// Distinct, sorted.
    pub jurisdictions: Vec<String>,
    pub built_at: Option<DateTime<Utc>>,
    pub version: u64,
}

// ============================================================================
// Retriever
// ============================================================================

type TableCache = Arc<RwLock<LruCache<String, Arc<Vec<StructuredTable>>>>>;

pub struct Retriever {
    config: EngineConfig,
    corpus: Arc<dyn CorpusLoader>,
    table_loader: Arc<dyn TableLoader>,
    cache: IndexCache,
    table_cache: TableCache,
    classifier: QueryClassifier,
    engine: ComputationEngine,
}

impl Retriever {
    pub fn new(
        config: EngineConfig,
        corpus: Arc<dyn CorpusLoader>,
        table_loader: Arc<dyn TableLoader>,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::Config)?;

        let capacity = NonZeroUsize::new(config.cache.table_cache_size).unwrap_or(NonZeroUsize::MIN);
        tracing::info!(
            ttl_secs = config.cache.ttl_secs,
            table_cache = capacity.get(),
            "Retriever initialized"
        );

        Ok(Self {
            cache: IndexCache::new(Duration::from_secs(config.cache.ttl_secs)),
            table_cache: Arc::new(RwLock::new(LruCache::new(capacity))),
            classifier: QueryClassifier::new(&config.vocabulary),
            engine: ComputationEngine::new(config.computation.clone()),
            config,
            corpus,
            table_loader,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer `query`, routing on its intent. Caller filters win over
    /// anything extracted from the text.
    pub async fn retrieve(&self, query: &str, filters: &SearchFilters) -> RetrievalOutcome {
        let snapshot = self.snapshot_or_empty().await;
        let known: &[String] = snapshot.as_ref().map(|s| s.jurisdictions.as_slice()).unwrap_or_default();

        let classification = self.classifier.classify_with(query, known);
        if matches!(
            classification.intent,
            QueryIntent::Greeting | QueryIntent::Faq | QueryIntent::OffTopic
        ) {
            let reply = (classification.rule == "faq_jurisdictions").then(|| jurisdictions_reply(known));
            return RetrievalOutcome::Direct { classification, reply };
        }

        let filters = crate::query::filters::extract_filters(query, known, filters);
        tracing::debug!(intent = ?classification.intent, ?filters, "Routing query");

        if classification.needs_computation {
            let documents = snapshot.as_ref().map(|s| s.documents.as_slice()).unwrap_or_default();
            let (answer, sources, tables_summary) = self.computational(query, documents, &filters).await;
            return RetrievalOutcome::Computational {
                classification,
                filters,
                answer,
                sources,
                tables_summary,
            };
        }

        let result = match &snapshot {
            Some(snapshot) => self.lexical(query, classification.intent, snapshot, &filters).await,
            None => LexicalResult::default(),
        };
        RetrievalOutcome::Lexical {
            classification,
            filters,
            result,
        }
    }

    /// Rank the documents passing `filters` against `query`. No
    /// classification and no filter extraction.
    pub async fn search(&self, query: &str, filters: &SearchFilters, limit: Option<usize>) -> LexicalResult {
        let Some(snapshot) = self.snapshot_or_empty().await else {
            return LexicalResult::default();
        };
        let filters = SearchFilters {
            limit: limit.or(filters.limit),
            ..filters.clone()
        };
        self.lexical(query, QueryIntent::SemanticSearch, &snapshot, &filters).await
    }

    /// Classify against the jurisdictions of the installed snapshot, if any.
    pub fn classify(&self, query: &str) -> Classification {
        self.classifier.classify_with(query, &self.known_jurisdictions())
    }

    pub fn extract_filters(&self, query: &str, existing: &SearchFilters) -> SearchFilters {
        crate::query::filters::extract_filters(query, &self.known_jurisdictions(), existing)
    }

    pub fn compute_aggregate(&self, query: &str, tables: &[StructuredTable]) -> ComputeAnswer {
        self.engine.compute_aggregate(query, tables)
    }

    /// Score breakdown of the document at corpus position `doc`.
    pub async fn explain(&self, query: &str, doc: usize) -> Option<ScoreExplanation> {
        let snapshot = self.snapshot_or_empty().await?;
        (doc < snapshot.len()).then(|| snapshot.index.explain(query, doc))
    }

    /// Drop the index snapshot and every cached table. The next query
    /// rebuilds from the loaders.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
        self.table_cache.write().clear();
        tracing::info!(epoch = self.cache.epoch(), "Index and table caches invalidated");
    }

    pub async fn stats(&self) -> CorpusStats {
        match self.snapshot_or_empty().await {
            Some(snapshot) => CorpusStats {
                total_documents: snapshot.len(),
                jurisdictions: snapshot.jurisdictions.clone(),
                built_at: Some(snapshot.built_at),
                version: snapshot.version,
            },
            None => CorpusStats::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------------

    async fn snapshot(&self) -> EngineResult<Arc<IndexSnapshot>> {
        let params = Bm25Params {
            k1: self.config.search.k1,
            b: self.config.search.b,
        };
        let title_weight = self.config.search.title_weight;
        let corpus = self.corpus.clone();

        self.cache
            .get_or_build(move |version| async move {
                let documents = corpus.list_documents().await.map_err(EngineError::CorpusLoad)?;
                tracing::info!(version, docs = documents.len(), "Building index snapshot");
                tokio::task::spawn_blocking(move || IndexSnapshot::build(documents, params, title_weight, version))
                    .await
                    .map_err(|e| EngineError::IndexBuild(e.to_string()))
            })
            .await
    }

    async fn snapshot_or_empty(&self) -> Option<Arc<IndexSnapshot>> {
        match self.snapshot().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Index unavailable, answering from an empty corpus");
                None
            }
        }
    }

    fn known_jurisdictions(&self) -> Vec<String> {
        self.cache
            .current()
            .map(|s| s.jurisdictions.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Lexical path
    // ------------------------------------------------------------------------

    async fn lexical(
        &self,
        query: &str,
        intent: QueryIntent,
        snapshot: &IndexSnapshot,
        filters: &SearchFilters,
    ) -> LexicalResult {
        let search = &self.config.search;
        let candidates: Vec<usize> = snapshot
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| filters.matches(doc))
            .map(|(i, _)| i)
            .collect();
        let terms = self.query_terms(query);
        let ranked: Vec<usize> = snapshot
            .index
            .search_within(&terms, &candidates, candidates.len())
            .into_iter()
            .map(|hit| hit.index)
            .collect();

        let (ordered, total_matches) = if matches!(intent, QueryIntent::SimpleListing | QueryIntent::Count) {
            // Every filtered document is a match; ranking only orders them.
            let seen: HashSet<usize> = ranked.iter().copied().collect();
            let rest = candidates.iter().copied().filter(|i| !seen.contains(i));
            let mut ordered = ranked;
            ordered.extend(newest_first(snapshot, rest));
            (ordered, candidates.len())
        } else if ranked.is_empty() && filters.is_constrained() {
            // No term overlap, but the filters alone still select documents.
            (newest_first(snapshot, candidates.iter().copied()), candidates.len())
        } else {
            let n = ranked.len();
            (ranked, n)
        };

        let limit = filters
            .limit
            .unwrap_or_else(|| optimal_limit(query, intent, filters.is_constrained(), search));
        let selected: Vec<&Document> = ordered
            .into_iter()
            .take(limit)
            .filter_map(|i| snapshot.documents.get(i))
            .collect();

        let max_chars = content_limit(query, intent, search);
        let contents = if max_chars > search.metadata_excerpt_chars {
            self.load_contents(&selected).await
        } else {
            vec![None; selected.len()]
        };

        let blocks: Vec<String> = selected
            .iter()
            .zip(&contents)
            .map(|(doc, content)| format_excerpt(doc, content.as_deref(), max_chars))
            .collect();

        tracing::debug!(
            ?intent,
            candidates = candidates.len(),
            total_matches,
            returned = selected.len(),
            max_chars,
            "Lexical retrieval"
        );

        LexicalResult {
            excerpt_text: join_excerpts(&blocks),
            sources: selected.iter().map(|doc| Source::from(*doc)).collect(),
            total_matches,
        }
    }

    fn query_terms(&self, query: &str) -> Vec<String> {
        let terms = tokenize(query);
        if self.config.search.expand_synonyms {
            expand_synonyms(&terms)
        } else {
            terms
        }
    }

    async fn load_contents(&self, docs: &[&Document]) -> Vec<Option<String>> {
        stream::iter(docs.iter().copied())
            .map(|doc| async move {
                match self.corpus.load_content(doc).await {
                    Ok(content) => content,
                    Err(source) => {
                        let error = EngineError::ContentLoad {
                            id: doc.id.clone(),
                            source,
                        };
                        tracing::warn!(error = %error, "Listing document without content");
                        None
                    }
                }
            })
            .buffered(self.config.cache.load_concurrency.max(1))
            .collect()
            .await
    }

    // ------------------------------------------------------------------------
    // Computational path
    // ------------------------------------------------------------------------

    async fn computational(
        &self,
        query: &str,
        documents: &[Document],
        filters: &SearchFilters,
    ) -> (ComputeAnswer, Vec<Source>, String) {
        let selected = recent_per_jurisdiction(
            documents.iter().filter(|doc| filters.matches(doc)),
            self.config.cache.max_docs_per_jurisdiction,
        );

        let loaded: Vec<Arc<Vec<StructuredTable>>> = stream::iter(selected.iter().copied())
            .map(|doc| self.tables_for(doc))
            .buffered(self.config.cache.load_concurrency.max(1))
            .collect()
            .await;

        let mut sources = Vec::new();
        let mut tables = Vec::new();
        for (doc, doc_tables) in selected.iter().zip(&loaded) {
            if doc_tables.is_empty() {
                continue;
            }
            sources.push(Source::from(*doc));
            tables.extend(doc_tables.iter().cloned());
        }

        let answer = self.engine.compute_aggregate(query, &tables);
        tracing::debug!(
            documents = selected.len(),
            tables = tables.len(),
            success = answer.success,
            "Computational retrieval"
        );
        (answer, sources, tables_summary(&tables))
    }

    /// Tables of `doc`, tagged with their source. Failed loads are not
    /// cached so the next query retries them.
    async fn tables_for(&self, doc: &Document) -> Arc<Vec<StructuredTable>> {
        let cached = self.table_cache.write().get(&doc.id).cloned();
        if let Some(tables) = cached {
            return tables;
        }

        let tables = match self.table_loader.load_tables(doc).await {
            Ok(tables) => tables,
            Err(source) => {
                let error = EngineError::TableLoad {
                    id: doc.id.clone(),
                    source,
                };
                tracing::warn!(error = %error, "Skipping document tables");
                return Arc::new(Vec::new());
            }
        };

        let source = TableSource {
            document_id: doc.id.clone(),
            jurisdiction: doc.jurisdiction.clone(),
            title: doc.title.clone(),
        };
        let tables = Arc::new(tag_tables(tables, &source));
        self.table_cache.write().put(doc.id.clone(), tables.clone());
        tables
    }
}

fn jurisdictions_reply(known: &[String]) -> String {
    if known.is_empty() {
        "Todavía no hay jurisdicciones cargadas.".to_string()
    } else {
        format!("Jurisdicciones disponibles: {}.", known.join(", "))
    }
}

fn newest_first(snapshot: &IndexSnapshot, indices: impl IntoIterator<Item = usize>) -> Vec<usize> {
    let mut indices: Vec<usize> = indices.into_iter().collect();
    indices.sort_by_key(|&i| Reverse(snapshot.documents.get(i).map(|d| d.published_date)));
    indices
}

/// The `per_jurisdiction` most recent documents of each jurisdiction,
/// jurisdictions in order of first appearance.
fn recent_per_jurisdiction<'a>(
    docs: impl Iterator<Item = &'a Document>,
    per_jurisdiction: usize,
) -> Vec<&'a Document> {
    let mut groups: Vec<Vec<&Document>> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for doc in docs {
        let slot = *slots
            .entry(fold_accents(doc.jurisdiction.trim()))
            .or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
        groups[slot].push(doc);
    }

    groups
        .into_iter()
        .flat_map(|mut group| {
            group.sort_by_key(|doc| Reverse(doc.published_date));
            group.truncate(per_jurisdiction);
            group
        })
        .collect()
}

//! BM25 ranking over an immutable in-memory inverted index.
//!
//! The index is built once from a corpus snapshot and never patched. Filtered
//! searches re-score a candidate subset against the same global statistics.

use crate::search::tokenizer::tokenize;
use crate::types::Document;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization strength.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: u32,
}

/// A ranked hit: position of the document in the indexed corpus plus its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub index: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermContribution {
    pub term: String,
    pub tf: u32,
    pub idf: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreExplanation {
    pub total: f64,
    pub terms: Vec<TermContribution>,
}

#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    total_length: u64,
}

/// Token stream indexed for a document. Title terms are repeated
/// `title_weight` times; metadata and any loaded content follow once.
pub fn document_terms(doc: &Document, title_weight: usize) -> Vec<String> {
    let title = tokenize(&doc.title);
    let mut terms = Vec::with_capacity(title.len() * title_weight.max(1) + 16);
    for _ in 0..title_weight.max(1) {
        terms.extend(title.iter().cloned());
    }
    terms.extend(tokenize(&doc.jurisdiction));
    terms.extend(tokenize(doc.document_type.label()));
    terms.extend(tokenize(&doc.official_number));
    if let Some(content) = &doc.content {
        terms.extend(tokenize(content));
    }
    terms
}

impl Bm25Index {
    /// Build from pre-tokenized streams; stream `i` becomes document `i`.
    pub fn build(streams: &[Vec<String>], params: Bm25Params) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(streams.len());
        let mut total_length = 0u64;

        for (doc_id, terms) in streams.iter().enumerate() {
            let mut tf: HashMap<&str, u32> = HashMap::new();
            for term in terms {
                *tf.entry(term.as_str()).or_insert(0) += 1;
            }
            for (term, count) in tf {
                postings.entry(term.to_string()).or_default().push(Posting {
                    doc: doc_id as u32,
                    tf: count,
                });
            }
            doc_lengths.push(terms.len() as u32);
            total_length += terms.len() as u64;
        }

        Self {
            params,
            postings,
            doc_lengths,
            total_length,
        }
    }

    /// Tokenize documents in parallel and index them in corpus order.
    pub fn build_documents(docs: &[Document], params: Bm25Params, title_weight: usize) -> Self {
        let streams: Vec<Vec<String>> = docs
            .par_iter()
            .map(|doc| document_terms(doc, title_weight))
            .collect();
        Self::build(&streams, params)
    }

    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn average_doc_length(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.total_length as f64 / self.doc_lengths.len() as f64
    }

    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    /// Smoothed IDF; 0 for terms absent from the corpus.
    pub fn idf(&self, term: &str) -> f64 {
        let df = self.doc_freq(term);
        if df == 0 {
            return 0.0;
        }
        let n = self.len() as f64;
        let df = df as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn term_score(&self, tf: u32, idf: f64, doc: usize, avgdl: f64) -> f64 {
        let Bm25Params { k1, b } = self.params;
        let tf = tf as f64;
        let dl = self.doc_lengths[doc] as f64;
        idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * dl / avgdl))
    }

    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredDoc> {
        self.search_terms(&tokenize(query), k)
    }

    pub fn search_terms(&self, terms: &[String], k: usize) -> Vec<ScoredDoc> {
        self.score_terms(terms, None, k)
    }

    /// Rank only `candidates` (corpus positions) with the snapshot-wide
    /// statistics. Positions outside the corpus are ignored.
    pub fn search_within(&self, terms: &[String], candidates: &[usize], k: usize) -> Vec<ScoredDoc> {
        let mut mask = vec![false; self.len()];
        for &c in candidates {
            if let Some(slot) = mask.get_mut(c) {
                *slot = true;
            }
        }
        self.score_terms(terms, Some(&mask), k)
    }

    fn score_terms(&self, terms: &[String], mask: Option<&[bool]>, k: usize) -> Vec<ScoredDoc> {
        let avgdl = self.average_doc_length();
        if k == 0 || terms.is_empty() || avgdl == 0.0 {
            return Vec::new();
        }

        let mut scores = vec![0.0f64; self.len()];
        for term in terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(term);
            for p in postings {
                let doc = p.doc as usize;
                if mask.is_some_and(|m| !m[doc]) {
                    continue;
                }
                scores[doc] += self.term_score(p.tf, idf, doc, avgdl);
            }
        }

        let mut hits: Vec<ScoredDoc> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, s)| *s > 0.0)
            .map(|(index, score)| ScoredDoc { index, score })
            .collect();
        // Stable sort keeps corpus order among equal scores.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }

    /// Per-term breakdown of a document's score for `query`.
    pub fn explain(&self, query: &str, doc: usize) -> ScoreExplanation {
        let avgdl = self.average_doc_length();
        let mut total = 0.0;
        let mut terms = Vec::new();

        for term in tokenize(query) {
            let idf = self.idf(&term);
            let tf = self
                .postings
                .get(&term)
                .and_then(|ps| {
                    ps.binary_search_by_key(&(doc as u32), |p| p.doc)
                        .ok()
                        .map(|i| ps[i].tf)
                })
                .unwrap_or(0);
            let contribution = if tf == 0 || doc >= self.len() || avgdl == 0.0 {
                0.0
            } else {
                self.term_score(tf, idf, doc, avgdl)
            };
            total += contribution;
            terms.push(TermContribution {
                term,
                tf,
                idf,
                contribution,
            });
        }

        ScoreExplanation { total, terms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streams(texts: &[&str]) -> Vec<Vec<String>> {
        texts.iter().map(|t| tokenize(t)).collect()
    }

    fn build_corpus() -> Bm25Index {
        Bm25Index::build(
            &streams(&[
                "ordenanza tasa habilitacion comercios",
                "decreto designacion personal municipal",
                "ordenanza transito estacionamiento medido",
                "ordenanza tasa alumbrado barrido limpieza tasa",
                "resolucion licencia conducir",
            ]),
            Bm25Params::default(),
        )
    }

    #[test]
    fn test_bm25_scores_positive_and_sorted() {
        let idx = build_corpus();
        let hits = idx.search("tasa ordenanza", 10);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.score > 0.0));
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // Document 3 mentions "tasa" twice.
        assert_eq!(hits[0].index, 3);
    }

    #[test]
    fn test_bm25_k_truncation() {
        let idx = build_corpus();
        assert_eq!(idx.search("ordenanza", 2).len(), 2);
        assert!(idx.search("ordenanza", 0).is_empty());
    }

    #[test]
    fn test_bm25_excludes_zero_scores() {
        let idx = build_corpus();
        let hits = idx.search("licencia", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 4);
        assert!(idx.search("inexistente", 10).is_empty());
    }

    #[test]
    fn test_bm25_ties_keep_corpus_order() {
        let idx = Bm25Index::build(
            &streams(&["alpha beta", "gamma delta", "alpha beta"]),
            Bm25Params::default(),
        );
        let hits = idx.search("alpha", 10);
        assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn test_idf_formula() {
        let idx = build_corpus();
        // N = 5, df("ordenanza") = 3
        let expected = ((5.0 - 3.0 + 0.5) / (3.0 + 0.5) + 1.0f64).ln();
        assert!((idx.idf("ordenanza") - expected).abs() < 1e-12);
        assert_eq!(idx.idf("nada"), 0.0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let a = build_corpus();
        let b = build_corpus();
        for q in ["tasa", "ordenanza transito", "personal municipal decreto"] {
            assert_eq!(a.search(q, 10), b.search(q, 10));
        }
    }

    #[test]
    fn test_search_within_uses_global_statistics() {
        let idx = build_corpus();
        let terms = tokenize("tasa");
        let global = idx.search_terms(&terms, 10);
        let narrowed = idx.search_within(&terms, &[0, 1, 99], 10);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].index, 0);
        let same = global.iter().find(|h| h.index == 0).unwrap();
        assert_eq!(narrowed[0].score, same.score);
    }

    #[test]
    fn test_explain_matches_search_score() {
        let idx = build_corpus();
        let hit = idx.search("tasa alumbrado", 1)[0];
        let explanation = idx.explain("tasa alumbrado", hit.index);
        assert!((explanation.total - hit.score).abs() < 1e-12);
        assert_eq!(explanation.terms.len(), 2);
        assert_eq!(explanation.terms[0].tf, 2);
    }
}

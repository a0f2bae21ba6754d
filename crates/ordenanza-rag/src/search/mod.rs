pub mod bm25;
pub mod tokenizer;

pub use bm25::{Bm25Index, Bm25Params, ScoreExplanation, ScoredDoc, TermContribution};
pub use tokenizer::{expand_synonyms, fold_accents, tokenize};

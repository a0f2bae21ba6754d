//! Intent-dependent sizing of a lexical result and excerpt assembly.

use crate::config::SearchConfig;
use crate::query::QueryIntent;
use crate::search::tokenizer::fold_accents;
use crate::types::Document;
use std::sync::LazyLock;

fn compile(patterns: &[&str]) -> Vec<regex::Regex> {
    patterns
        .iter()
        .map(|p| regex::Regex::new(p).expect("context regex is valid"))
        .collect()
}

fn any_match(res: &[regex::Regex], text: &str) -> bool {
    res.iter().any(|re| re.is_match(text))
}

/// Enumerations of documents: "decretos 2025", "cuántos decretos", "listar".
/// Only plural type names count, so "ordenanza 2833" stays a lookup.
static LISTING_RES: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b(?:ordenanzas|decretos|resoluciones|ordinances|decrees|resolutions)\b.*\b\d{4}\b",
        r"\bcuant[oa]s?\b.+\b(?:ordenanzas?|decretos?|resoluciones?)\b",
        r"\b(?:lista|listar|listado|mostrar)\b|\btod[oa]s\b.*\b(?:los|las)\b|\bque\b.*\bhay\b",
        r"\bcantidad\b|\btotal\b|\bhow many\b|\blist\b",
    ])
});

static FULL_CONTENT_RES: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bque\b.*\bdice\b|\bcontenido\b|\btexto\b|\barticulos?\b",
        r"\bresumen\b|\bdetalle\b|\bwhat does\b.*\bsay\b|\bsummary\b",
    ])
});

static METADATA_ONLY_RES: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bcual\b.*\bultim[oa]\b",
        r"\bcual\b.*\bmas\b.*\breciente\b",
        r"\bexiste\b",
        r"\bvigente\b",
        r"\bfecha\b.*\bordenanza\b",
        r"\bnumero\b.*\bdecreto\b",
    ])
});

static PROVISION_RES: LazyLock<Vec<regex::Regex>> =
    LazyLock::new(|| compile(&[r"\bestablece\b|\bdispone\b"]));

/// "ordenanza 2833", "decreto N° 123"; plural years like "decretos 2025"
/// do not qualify.
static EXACT_NUMBER_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:ordenanza|decreto|resolucion|disposicion)\s+(?:n[°º]?|nro\.?)?\s*\d{1,4}\b")
        .expect("exact number regex is valid")
});

static SINGLE_DOC_RES: LazyLock<Vec<regex::Regex>> =
    LazyLock::new(|| compile(&[r"\bcual\b.*\bultim[oa]\b", r"\bexiste\b", r"\blatest\b"]));

/// Characters of each document's text to include. At the metadata size no
/// text is loaded at all.
pub fn content_limit(query: &str, intent: QueryIntent, config: &SearchConfig) -> usize {
    let folded = fold_accents(query);
    if matches!(intent, QueryIntent::SimpleListing | QueryIntent::Count) || any_match(&LISTING_RES, &folded) {
        return config.metadata_excerpt_chars;
    }
    if any_match(&FULL_CONTENT_RES, &folded) {
        return config.full_excerpt_chars;
    }
    if any_match(&METADATA_ONLY_RES, &folded) {
        return config.metadata_excerpt_chars;
    }
    if any_match(&PROVISION_RES, &folded) {
        return config.provision_excerpt_chars;
    }
    config.excerpt_chars
}

/// Documents to return when the caller gave no limit.
pub fn optimal_limit(query: &str, intent: QueryIntent, has_filters: bool, config: &SearchConfig) -> usize {
    let folded = fold_accents(query);
    if matches!(intent, QueryIntent::SimpleListing | QueryIntent::Count) || any_match(&LISTING_RES, &folded) {
        return if has_filters {
            config.listing_limit
        } else {
            config.unfiltered_listing_limit
        };
    }
    if has_filters && EXACT_NUMBER_RE.is_match(&folded) {
        return 1;
    }
    if any_match(&SINGLE_DOC_RES, &folded) {
        return 1;
    }
    if has_filters {
        config.filtered_limit
    } else {
        config.default_limit
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// One document block of the context handed to the caller.
pub fn format_excerpt(doc: &Document, content: Option<&str>, max_chars: usize) -> String {
    let mut block = format!(
        "[{}] {} {}\nTítulo: {}\nFecha: {}\nEstado: {}",
        doc.jurisdiction,
        doc.document_type.label().to_uppercase(),
        doc.official_number,
        doc.title,
        doc.published_date.format("%Y-%m-%d"),
        doc.status.label()
    );
    if let Some(text) = content.map(str::trim).filter(|t| !t.is_empty()) {
        let excerpt = truncate_chars(text, max_chars);
        block.push_str("\nContenido: ");
        block.push_str(excerpt);
        if excerpt.len() < text.len() {
            block.push('…');
        }
    }
    block
}

pub fn join_excerpts(blocks: &[String]) -> String {
    blocks.join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentStatus, DocumentType};
    use chrono::NaiveDate;

    fn cfg() -> SearchConfig {
        SearchConfig::default()
    }

    #[test]
    fn test_content_limits() {
        let c = cfg();
        assert_eq!(content_limit("decretos de merlo 2025", QueryIntent::SimpleListing, &c), 200);
        assert_eq!(content_limit("qué dice la ordenanza de tránsito", QueryIntent::SemanticSearch, &c), 2000);
        assert_eq!(content_limit("resumen del presupuesto", QueryIntent::SemanticSearch, &c), 2000);
        assert_eq!(content_limit("cuál es la última ordenanza", QueryIntent::SemanticSearch, &c), 200);
        assert_eq!(content_limit("qué establece sobre residuos", QueryIntent::SemanticSearch, &c), 5000);
        assert_eq!(content_limit("tasas viales", QueryIntent::SemanticSearch, &c), 500);
    }

    #[test]
    fn test_optimal_limits() {
        let c = cfg();
        assert_eq!(optimal_limit("decretos 2025", QueryIntent::SimpleListing, true, &c), 100);
        assert_eq!(optimal_limit("decretos 2025", QueryIntent::SimpleListing, false, &c), 10);
        assert_eq!(optimal_limit("ordenanza 2833", QueryIntent::SemanticSearch, true, &c), 1);
        assert_eq!(optimal_limit("ordenanza 2833", QueryIntent::SemanticSearch, false, &c), 5);
        assert_eq!(optimal_limit("existe una tasa vial", QueryIntent::SemanticSearch, false, &c), 1);
        assert_eq!(optimal_limit("tasas viales", QueryIntent::SemanticSearch, true, &c), 10);
        assert_eq!(optimal_limit("tasas viales", QueryIntent::SemanticSearch, false, &c), 5);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("añoñaño", 3), "año");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_format_excerpt() {
        let doc = Document {
            id: "1".into(),
            jurisdiction: "Merlo".into(),
            document_type: DocumentType::Ordinance,
            official_number: "2833".into(),
            title: "Tasa vial".into(),
            content: None,
            published_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            status: DocumentStatus::Active,
            source_url: String::new(),
            document_types: None,
        };
        let block = format_excerpt(&doc, Some("Artículo 1: fíjase la tasa"), 10);
        assert_eq!(
            block,
            "[Merlo] ORDENANZA 2833\nTítulo: Tasa vial\nFecha: 2025-04-02\nEstado: vigente\nContenido: Artículo 1…"
        );
        assert!(!format_excerpt(&doc, None, 10).contains("Contenido"));
    }
}

//! Structured filters pulled out of free text: jurisdiction, year and
//! document type.

use crate::search::tokenizer::fold_accents;
use crate::types::{DocumentType, SearchFilters, TypeFilter};
use chrono::NaiveDate;
use std::sync::LazyLock;

pub const MIN_YEAR: i32 = 2010;
pub const MAX_YEAR: i32 = 2030;

/// Year phrasings from most to least specific, over folded text ("año"
/// folds to "ano").
static YEAR_RES: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    [
        r"\b(?:en el ano|del ano|in the year|ano|year)\s+(\d{4})\b",
        r"\b(?:del|de|of)\s+(\d{4})\b",
        r"\b(?:en el|en|in)\s+(\d{4})\b",
        r"\b(\d{4})\b",
    ]
    .iter()
    .map(|p| regex::Regex::new(p).expect("year regex is valid"))
    .collect()
});

static DOCUMENT_TYPE_RES: LazyLock<Vec<(DocumentType, regex::Regex)>> = LazyLock::new(|| {
    [
        (DocumentType::Ordinance, r"\bordenanza|\bordinances?\b"),
        (DocumentType::Decree, r"\bdecreto|\bdecrees?\b"),
        (DocumentType::Resolution, r"\bresolucion|\bresolutions?\b"),
        (DocumentType::Ruling, r"\bdisposicion|\brulings?\b"),
        (DocumentType::Agreement, r"\bconvenio|\bagreements?\b"),
        (DocumentType::Tender, r"\blicitacion|\btenders?\b"),
        (DocumentType::Bulletin, r"\bboletin|\bbulletins?\b"),
    ]
    .into_iter()
    .map(|(ty, p)| (ty, regex::Regex::new(p).expect("document type regex is valid")))
    .collect()
});

/// First plausible year mentioned in `query`.
pub fn extract_year(query: &str) -> Option<i32> {
    let folded = fold_accents(query);
    YEAR_RES.iter().find_map(|re| {
        re.captures_iter(&folded)
            .filter_map(|c| c[1].parse::<i32>().ok())
            .find(|y| (MIN_YEAR..=MAX_YEAR).contains(y))
    })
}

/// Inclusive Jan 1 to Dec 31 range of `year`.
pub fn year_range(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// Known jurisdiction mentioned in `query`, compared accent- and
/// case-insensitively. The longest matching name wins so that "San Martín"
/// does not shadow "General San Martín".
pub fn extract_jurisdiction<S: AsRef<str>>(query: &str, known: &[S]) -> Option<String> {
    let folded = fold_accents(query);
    known
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| {
            let name = fold_accents(name.trim());
            !name.is_empty() && folded.contains(name.as_str())
        })
        .max_by_key(|name| name.trim().chars().count())
        .map(|name| name.trim().to_string())
}

pub fn extract_document_type(query: &str) -> Option<DocumentType> {
    let folded = fold_accents(query);
    DOCUMENT_TYPE_RES
        .iter()
        .find(|(_, re)| re.is_match(&folded))
        .map(|(ty, _)| *ty)
}

/// Merge filters extracted from `query` under the caller's `existing` ones.
///
/// Caller values always win. A pinned document type, `all` included, skips
/// type extraction, and any pinned date bound skips year extraction.
pub fn extract_filters<S: AsRef<str>>(query: &str, known: &[S], existing: &SearchFilters) -> SearchFilters {
    let jurisdiction = existing
        .jurisdiction
        .clone()
        .or_else(|| extract_jurisdiction(query, known));

    let document_type = existing
        .document_type
        .or_else(|| extract_document_type(query).map(TypeFilter::Only));

    let (date_from, date_to) = if existing.date_from.is_some() || existing.date_to.is_some() {
        (existing.date_from, existing.date_to)
    } else {
        match extract_year(query).and_then(year_range) {
            Some((from, to)) => (Some(from), Some(to)),
            None => (None, None),
        }
    };

    let filters = SearchFilters {
        jurisdiction,
        document_type,
        date_from,
        date_to,
        limit: existing.limit,
    };
    tracing::debug!(?filters, "Extracted search filters");
    filters
}

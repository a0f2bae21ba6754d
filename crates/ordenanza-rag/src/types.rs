use crate::search::tokenizer::fold_accents;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Documents
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[serde(alias = "ordenanza")]
    Ordinance,
    #[serde(alias = "decreto")]
    Decree,
    #[serde(alias = "boletin")]
    Bulletin,
    #[serde(alias = "resolucion")]
    Resolution,
    #[serde(alias = "disposicion")]
    Ruling,
    #[serde(alias = "convenio")]
    Agreement,
    #[serde(alias = "licitacion")]
    Tender,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        DocumentType::Ordinance,
        DocumentType::Decree,
        DocumentType::Bulletin,
        DocumentType::Resolution,
        DocumentType::Ruling,
        DocumentType::Agreement,
        DocumentType::Tender,
    ];

    /// Display name in the corpus language.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Ordinance => "Ordenanza",
            DocumentType::Decree => "Decreto",
            DocumentType::Bulletin => "Boletín",
            DocumentType::Resolution => "Resolución",
            DocumentType::Ruling => "Disposición",
            DocumentType::Agreement => "Convenio",
            DocumentType::Tender => "Licitación",
        }
    }

    /// Parse either the English variant name or the Spanish source name,
    /// ignoring case and accents.
    pub fn parse(name: &str) -> Option<Self> {
        match fold_accents(name.trim()).as_str() {
            "ordinance" | "ordenanza" => Some(DocumentType::Ordinance),
            "decree" | "decreto" => Some(DocumentType::Decree),
            "bulletin" | "boletin" => Some(DocumentType::Bulletin),
            "resolution" | "resolucion" => Some(DocumentType::Resolution),
            "ruling" | "disposicion" => Some(DocumentType::Ruling),
            "agreement" | "convenio" => Some(DocumentType::Agreement),
            "tender" | "licitacion" => Some(DocumentType::Tender),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[serde(alias = "vigente")]
    Active,
    #[serde(alias = "derogada")]
    Repealed,
    #[serde(alias = "modificada")]
    Amended,
    #[default]
    Unknown,
}

impl DocumentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "vigente",
            DocumentStatus::Repealed => "derogada",
            DocumentStatus::Amended => "modificada",
            DocumentStatus::Unknown => "sin dato",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub jurisdiction: String,
    pub document_type: DocumentType,
    pub official_number: String,
    pub title: String,
    /// Full text, absent until loaded.
    #[serde(default)]
    pub content: Option<String>,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub source_url: String,
    /// Types bundled in a composite bulletin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_types: Option<Vec<DocumentType>>,
}

impl Document {
    pub fn has_type(&self, ty: DocumentType) -> bool {
        self.document_type == ty
            || self
                .document_types
                .as_ref()
                .is_some_and(|types| types.contains(&ty))
    }

    pub fn year(&self) -> i32 {
        self.published_date.year()
    }
}

/// Citation handed back alongside retrieved excerpts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub jurisdiction: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_types: Option<Vec<DocumentType>>,
}

impl From<&Document> for Source {
    fn from(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            url: doc.source_url.clone(),
            jurisdiction: doc.jurisdiction.clone(),
            document_type: doc.document_type,
            status: doc.status,
            document_types: doc.document_types.clone(),
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    /// Explicit wildcard. Pinning it still blocks type extraction.
    All,
    Only(DocumentType),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub document_type: Option<TypeFilter>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchFilters {
    /// True when at least one field narrows the corpus.
    pub fn is_constrained(&self) -> bool {
        self.jurisdiction.is_some()
            || matches!(self.document_type, Some(TypeFilter::Only(_)))
            || self.date_from.is_some()
            || self.date_to.is_some()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(jurisdiction) = &self.jurisdiction {
            if fold_accents(jurisdiction.trim()) != fold_accents(doc.jurisdiction.trim()) {
                return false;
            }
        }
        if let Some(TypeFilter::Only(ty)) = self.document_type {
            if !doc.has_type(ty) {
                return false;
            }
        }
        if self.date_from.is_some_and(|from| doc.published_date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| doc.published_date > to) {
            return false;
        }
        true
    }
}

// ============================================================================
// Structured tables
// ============================================================================

/// One table row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    String,
    Number,
    Date,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<String>,
    #[serde(default)]
    pub types: Vec<ColumnType>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub sum: f64,
    pub max: f64,
    pub min: f64,
    pub avg: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub numeric_stats: BTreeMap<String, NumericStats>,
}

/// Document a table was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSource {
    pub document_id: String,
    pub jurisdiction: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredTable {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: usize,
    pub schema: TableSchema,
    #[serde(rename = "data", default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub stats: TableStats,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub extraction_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TableSource>,
}

impl StructuredTable {
    /// Declared type of `column`; undeclared columns count as strings.
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        let pos = self.schema.columns.iter().position(|c| c == column)?;
        Some(self.schema.types.get(pos).copied().unwrap_or_default())
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.schema
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.schema.types.get(*i) == Some(&ColumnType::Number))
            .map(|(_, c)| c.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(jurisdiction: &str, ty: DocumentType, date: (i32, u32, u32)) -> Document {
        Document {
            id: "d1".into(),
            jurisdiction: jurisdiction.into(),
            document_type: ty,
            official_number: "10".into(),
            title: "Ordenanza 10".into(),
            content: None,
            published_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            status: DocumentStatus::Active,
            source_url: String::new(),
            document_types: None,
        }
    }

    #[test]
    fn test_empty_filters_match_everything() {
        let filters = SearchFilters::default();
        assert!(!filters.is_constrained());
        assert!(filters.matches(&doc("Merlo", DocumentType::Decree, (2011, 3, 4))));
    }

    #[test]
    fn test_filter_matching() {
        let filters = SearchFilters {
            jurisdiction: Some("carlos tejedor".into()),
            document_type: Some(TypeFilter::Only(DocumentType::Ordinance)),
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 12, 31),
            limit: None,
        };
        assert!(filters.matches(&doc("Carlos Tejedor", DocumentType::Ordinance, (2025, 12, 31))));
        assert!(!filters.matches(&doc("Carlos Tejedor", DocumentType::Decree, (2025, 6, 1))));
        assert!(!filters.matches(&doc("Carlos Tejedor", DocumentType::Ordinance, (2026, 1, 1))));
        assert!(!filters.matches(&doc("Merlo", DocumentType::Ordinance, (2025, 6, 1))));
    }

    #[test]
    fn test_composite_bulletin_matches_bundled_type() {
        let mut bulletin = doc("Merlo", DocumentType::Bulletin, (2024, 2, 2));
        bulletin.document_types = Some(vec![DocumentType::Decree, DocumentType::Resolution]);
        let filters = SearchFilters {
            document_type: Some(TypeFilter::Only(DocumentType::Decree)),
            ..Default::default()
        };
        assert!(filters.matches(&bulletin));
    }

    #[test]
    fn test_document_deserializes_spanish_vocabulary() {
        let json = r#"{
            "id": "ct-1", "jurisdiction": "Carlos Tejedor", "document_type": "ordenanza",
            "official_number": "2833", "title": "Ordenanza 2833",
            "published_date": "2025-03-10", "status": "vigente"
        }"#;
        let parsed: Document = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.document_type, DocumentType::Ordinance);
        assert_eq!(parsed.status, DocumentStatus::Active);
        assert_eq!(DocumentType::parse("Resolución"), Some(DocumentType::Resolution));
    }

    #[test]
    fn test_table_deserializes_extractor_shape() {
        let json = r#"{
            "id": "t1", "title": "Tasas", "position": 0,
            "schema": {"columns": ["categoria", "monto"], "types": ["string", "number"]},
            "data": [{"categoria": "A", "monto": "1.500,00"}],
            "stats": {"row_count": 1, "numeric_stats": {"monto": {"sum": 1500, "max": 1500, "min": 1500, "avg": 1500, "count": 1}}}
        }"#;
        let table: StructuredTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.column_type("monto"), Some(ColumnType::Number));
        assert_eq!(table.numeric_columns().collect::<Vec<_>>(), vec!["monto"]);
    }
}

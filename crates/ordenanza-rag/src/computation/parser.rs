//! Turns an aggregation question into a [`ParsedOperation`].
//!
//! Operation detection is an ordered rule list over the accent-folded query;
//! the first rule whose pattern matches decides the operation.

use crate::computation::numeric::{is_relevant_column, parse_number, value_number};
use crate::search::tokenizer::{fold_accents, is_stopword, tokenize};
use crate::types::StructuredTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    FindMinRow,
    FindMaxRow,
    Filter,
    GroupBy,
    Compare,
}

/// Per-bucket aggregate for grouping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    Contains,
    Gt,
    Lt,
    Gte,
    Lte,
    Between,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Range(f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    /// `None` applies the filter to the operation's target column.
    pub column: Option<String>,
    pub op: FilterOp,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedOperation {
    pub operation: Operation,
    /// Absent when no column matched; resolved at execution from `keywords`.
    pub target_column: Option<String>,
    pub group_by_column: Option<String>,
    pub aggregate: Aggregate,
    pub filters: Vec<RowFilter>,
    pub keywords: Vec<String>,
}

// ============================================================================
// Vocabulary
// ============================================================================

const MONEY_NOUNS: &str = "tasa|tarifa|monto|importe|valor|precio|amount|fee|rate|price|value";

static OPERATION_RULES: LazyLock<Vec<(Operation, regex::Regex)>> = LazyLock::new(|| {
    let rules: Vec<(Operation, String)> = vec![
        (
            Operation::FindMaxRow,
            format!(
                r"\b(?:mayor|maxim[oa]s?|highest|maximum|largest|biggest)\s+(?:{m})|\b(?:{m})e?s?\s+(?:mas alt[oa]|mas car[oa]|mayor|maxim[oa]|highest|maximum)\b",
                m = MONEY_NOUNS
            ),
        ),
        (
            Operation::FindMinRow,
            format!(
                r"\b(?:menor|minim[oa]s?|lowest|minimum|smallest)\s+(?:{m})|\b(?:{m})e?s?\s+(?:mas baj[oa]|mas barat[oa]|menor|minim[oa]|lowest|minimum)\b",
                m = MONEY_NOUNS
            ),
        ),
        (
            Operation::Compare,
            r"\bcompar|\bdiferencia|\bversus\b|\bvs\b|\bentre (?:los |las )?(?:municipios|jurisdicciones)".into(),
        ),
        (
            Operation::GroupBy,
            r"\bpor (?:categoria|tipo|rubro|clase|zona|concepto|municipio|jurisdiccion)|\bagrupa|\bseparar|\bgroup(?:ed)? by\b|\b(?:by|per) (?:category|type|class|zone|group)".into(),
        ),
        (Operation::Sum, r"\bsuma|\bsumar|\btotal|\bsum\b".into()),
        (Operation::Avg, r"\bpromedio|\bmedia\b|\baverage\b|\bmean\b".into()),
        (
            Operation::Count,
            r"\bcuant[oa]s\b|\bcantidad\b|\bhow many\b|\bcount\b|\bnumber of\b|\bnumero de\b".into(),
        ),
        (
            Operation::Filter,
            r"\b(?:mayor|menor|superior|inferior)(?:es)?\s+(?:que|a|de)\s+\$?\s*\d|\b(?:mas|menos)\s+de\s+\$?\s*\d|\b(?:entre|between)\s+\$?\s*\d[\d.,]*\s+(?:y|and)\b|\b(?:greater|more|less|lower|higher)\s+than\s+\$?\s*\d|\b(?:over|under|above|below)\s+\$?\s*\d".into(),
        ),
        (
            Operation::Max,
            r"\bmaxim[oa]s?\b|\bmayor\b|\bmas alt[oa]\b|\bmaximum\b|\bhighest\b|\bmax\b".into(),
        ),
        (
            Operation::Min,
            r"\bminim[oa]s?\b|\bmenor\b|\bmas baj[oa]\b|\bminimum\b|\blowest\b|\bmin\b".into(),
        ),
        (
            Operation::Filter,
            r"\bfiltrar|\bmostrar|\blistar|\bcuales\b|\bque .*paga|\bwhich\b|\bshow\b|\blist\b".into(),
        ),
    ];
    rules
        .into_iter()
        .map(|(op, p)| (op, regex::Regex::new(&p).expect("operation regex is valid")))
        .collect()
});

static AVG_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\bpromedio|\bmedia\b|\baverage\b|\bmean\b").expect("avg regex is valid")
});
static MAX_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\bmaxim|\bmayor\b|\bhighest\b|\bmaximum\b").expect("max regex is valid")
});
static MIN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\bminim|\bmenor\b|\blowest\b|\bminimum\b").expect("min regex is valid")
});
static COUNT_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\bcuant[oa]s\b|\bcantidad\b|\bhow many\b|\bcount\b")
        .expect("count regex is valid")
});

static GROUP_TARGET_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:group(?:ed)? by|agrupad[oa]s? por|por|by|per)\s+([a-z_]{3,})")
        .expect("group target regex is valid")
});
static CATEGORY_VALUE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:local|categoria|category|tipo|rubro)\s+(?:de\s+)?([^,\s]+)")
        .expect("category value regex is valid")
});
static BETWEEN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:entre|between)\s+\$?\s*(\d[\d.,]*)\s+(?:y|and)\s+\$?\s*(\d[\d.,]*)")
        .expect("between regex is valid")
});
static GTE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:al menos|como minimo|at least)\s+\$?\s*(\d[\d.,]*)")
        .expect("gte regex is valid")
});
static LTE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:hasta|como maximo|at most)\s+\$?\s*(\d[\d.,]*)")
        .expect("lte regex is valid")
});
static GT_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"\b(?:mayor(?:es)?|mas|superior(?:es)?|greater|more|higher|over|above)\s+(?:que|a|de|than)?\s*\$?\s*(\d[\d.,]*)",
    )
    .expect("gt regex is valid")
});
static LT_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"\b(?:menor(?:es)?|menos|inferior(?:es)?|less|lower|under|below)\s+(?:que|a|de|than)?\s*\$?\s*(\d[\d.,]*)",
    )
    .expect("lt regex is valid")
});

static MONETARY_COLUMN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"monto|importe|valor|tasa|tarifa|total|precio|amount|value|price|fee")
        .expect("monetary column regex is valid")
});
static CATEGORICAL_COLUMN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"categor|tipo|rubro|clase|concepto|zona|category|type|class|group")
        .expect("categorical column regex is valid")
});
static JURISDICTION_COLUMN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"municipio|partido|jurisdiccion|localidad|jurisdiction|municipality")
        .expect("jurisdiction column regex is valid")
});

/// Words that describe the operation rather than the data being asked about.
static OPERATION_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "suma", "sumar", "sumas", "sum", "total", "totales", "totalizar", "promedio", "media",
        "average", "mean", "maximo", "maxima", "maximos", "maximas", "minimo", "minima",
        "minimos", "minimas", "mayor", "mayores", "menor", "menores", "maximum", "minimum",
        "highest", "lowest", "largest", "smallest", "biggest", "max", "min", "cuanto", "cuanta",
        "cuantos", "cuantas", "cantidad", "how", "many", "count", "number", "numero", "comparar",
        "compara", "comparacion", "compare", "diferencia", "versus", "agrupar", "agrupado",
        "agrupados", "group", "grouped", "cual", "cuales", "which", "what", "the", "and", "for",
        "all", "todas", "todos", "mostrar", "listar", "show", "list", "filtrar", "between",
        "greater", "less", "than", "more", "over", "under", "above", "below", "alto", "alta",
        "altos", "altas", "bajo", "baja", "menos", "hay", "tabla", "tablas", "per", "distintos",
        "distintas", "diferentes", "caro", "cara", "barato", "barata", "calcular", "calcula",
        "calculate", "dame", "decime", "with", "are", "superior", "inferior", "cada", "each",
    ]
    .into_iter()
    .collect()
});

/// Column-name aliases for query terms, in folded form.
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("monto", &["monto", "importe", "tasa", "valor", "tarifa", "precio", "total"]),
    ("tasa", &["tasa", "tarifa", "valor", "importe", "monto"]),
    ("tarifa", &["tarifa", "tasa", "valor", "precio", "importe"]),
    ("precio", &["precio", "valor", "tarifa", "importe"]),
    ("salario", &["salario", "sueldo", "remuneracion", "haberes", "honorarios"]),
    ("sueldo", &["sueldo", "salario", "remuneracion", "haberes", "honorarios"]),
    ("vial", &["vial", "vialidad", "calle"]),
    ("gasto", &["gasto", "egreso", "monto", "importe"]),
    ("pago", &["pago", "abono", "pagado", "monto"]),
    ("amount", &["amount", "monto", "importe", "value", "valor", "total"]),
    ("fee", &["fee", "rate", "tasa", "tarifa"]),
    ("price", &["price", "precio", "value", "valor"]),
];

// ============================================================================
// Keywords and columns
// ============================================================================

/// Strip plural endings so "tasas" and "montos" meet "tasa" and "monto".
pub fn lemma(word: &str) -> String {
    let n = word.chars().count();
    if n > 4 && word.ends_with("es") && !word.ends_with("ees") {
        word[..word.len() - 2].to_string()
    } else if n > 3 && word.ends_with('s') {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Data-bearing keywords of a query: tokens minus operation vocabulary and
/// bare numbers, lemmatized and deduplicated in order.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for token in tokenize(query) {
        if OPERATION_WORDS.contains(token.as_str()) || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let stem = lemma(&token);
        if seen.insert(stem.clone()) {
            keywords.push(stem);
        }
    }
    if let Some(caps) = CATEGORY_VALUE_RE.captures(&fold_accents(query)) {
        let value = caps[1].to_string();
        if !is_stopword(&value) && seen.insert(value.clone()) {
            keywords.push(value);
        }
    }
    keywords
}

pub fn aliases_for(term: &str) -> &'static [&'static str] {
    COLUMN_ALIASES
        .iter()
        .find(|(key, _)| *key == term)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

fn column_matches(column: &str, term: &str) -> bool {
    let folded = fold_accents(column);
    folded.contains(term) || (folded.chars().count() >= 3 && term.contains(folded.as_str()))
}

/// Columns that can feed numeric aggregation: not denylisted, and either
/// declared numeric or holding at least one numeric cell.
pub fn measure_columns(table: &StructuredTable) -> Vec<&str> {
    table
        .schema
        .columns
        .iter()
        .map(String::as_str)
        .filter(|c| is_relevant_column(c))
        .filter(|c| {
            table.column_type(c) == Some(crate::types::ColumnType::Number)
                || table.rows.iter().any(|r| r.get(*c).and_then(value_number).is_some())
        })
        .collect()
}

/// Match keywords against measure columns, then against their aliases.
pub fn resolve_target_column(keywords: &[String], tables: &[&StructuredTable]) -> Option<String> {
    for kw in keywords {
        for table in tables {
            if let Some(col) = measure_columns(table).into_iter().find(|c| column_matches(c, kw)) {
                return Some(col.to_string());
            }
        }
    }
    for kw in keywords {
        for alias in aliases_for(kw) {
            for table in tables {
                if let Some(col) = measure_columns(table)
                    .into_iter()
                    .find(|c| fold_accents(c).contains(alias))
                {
                    return Some(col.to_string());
                }
            }
        }
    }
    None
}

/// Late column lookup by a single term and its aliases, falling back to the
/// first monetary-looking measure column.
pub fn find_column(tables: &[&StructuredTable], term: &str) -> Option<String> {
    let mut terms: Vec<&str> = vec![term];
    terms.extend(aliases_for(term).iter().copied());

    for table in tables {
        for column in table.schema.columns.iter().filter(|c| is_relevant_column(c)) {
            if terms.iter().any(|t| !t.is_empty() && column_matches(column, t)) {
                return Some(column.clone());
            }
        }
    }
    tables.iter().find_map(|table| {
        measure_columns(table)
            .into_iter()
            .find(|c| MONETARY_COLUMN_RE.is_match(&fold_accents(c)))
            .map(str::to_string)
    })
}

fn find_column_by_pattern(tables: &[&StructuredTable], re: &regex::Regex) -> Option<String> {
    tables.iter().find_map(|table| {
        table
            .schema
            .columns
            .iter()
            .find(|c| re.is_match(&fold_accents(c)))
            .cloned()
    })
}

/// Categorical column named in "por X" / "by X", else any category-like column.
fn resolve_group_column(folded: &str, tables: &[&StructuredTable]) -> Option<String> {
    for caps in GROUP_TARGET_RE.captures_iter(folded) {
        let wanted = lemma(&caps[1]);
        let hit = tables.iter().find_map(|table| {
            table
                .schema
                .columns
                .iter()
                .find(|c| fold_accents(c).contains(wanted.as_str()))
                .cloned()
        });
        if hit.is_some() {
            return hit;
        }
    }
    find_column_by_pattern(tables, &CATEGORICAL_COLUMN_RE)
}

fn detect_operation(folded: &str) -> Option<Operation> {
    OPERATION_RULES
        .iter()
        .find(|(_, re)| re.is_match(folded))
        .map(|(op, _)| *op)
}

fn detect_aggregate(folded: &str) -> Aggregate {
    if AVG_RE.is_match(folded) {
        Aggregate::Avg
    } else if MAX_RE.is_match(folded) {
        Aggregate::Max
    } else if MIN_RE.is_match(folded) {
        Aggregate::Min
    } else if COUNT_RE.is_match(folded) {
        Aggregate::Count
    } else {
        Aggregate::Sum
    }
}

fn threshold(raw: &str) -> Option<f64> {
    parse_number(raw.trim_end_matches(['.', ',']))
}

fn extract_row_filters(folded: &str, tables: &[&StructuredTable]) -> Vec<RowFilter> {
    let mut filters = Vec::new();

    if let Some(category_col) = find_column_by_pattern(tables, &CATEGORICAL_COLUMN_RE) {
        if let Some(caps) = CATEGORY_VALUE_RE.captures(folded) {
            let value = caps[1].to_string();
            if !is_stopword(&value) && value != "por" {
                filters.push(RowFilter {
                    column: Some(category_col),
                    op: FilterOp::Contains,
                    value: FilterValue::Text(value),
                });
            }
        }
    }

    if let Some(jurisdiction_col) = find_column_by_pattern(tables, &JURISDICTION_COLUMN_RE) {
        let named = tables
            .iter()
            .flat_map(|t| t.rows.iter())
            .filter_map(|row| row.get(&jurisdiction_col).and_then(|v| v.as_str()))
            .find(|v| {
                let f = fold_accents(v.trim());
                f.chars().count() >= 3 && folded.contains(f.as_str())
            });
        if let Some(name) = named {
            filters.push(RowFilter {
                column: Some(jurisdiction_col),
                op: FilterOp::Equals,
                value: FilterValue::Text(name.trim().to_string()),
            });
        }
    }

    if let Some(caps) = BETWEEN_RE.captures(folded) {
        if let (Some(lo), Some(hi)) = (threshold(&caps[1]), threshold(&caps[2])) {
            filters.push(RowFilter {
                column: None,
                op: FilterOp::Between,
                value: FilterValue::Range(lo.min(hi), lo.max(hi)),
            });
        }
        return filters;
    }

    let bounds: [(&regex::Regex, FilterOp); 4] = [
        (&*GTE_RE, FilterOp::Gte),
        (&*LTE_RE, FilterOp::Lte),
        (&*GT_RE, FilterOp::Gt),
        (&*LT_RE, FilterOp::Lt),
    ];
    let mut seen_lower = false;
    let mut seen_upper = false;
    for (re, op) in bounds {
        let lower = matches!(op, FilterOp::Gte | FilterOp::Gt);
        if (lower && seen_lower) || (!lower && seen_upper) {
            continue;
        }
        if let Some(value) = re.captures(folded).and_then(|c| threshold(&c[1])) {
            filters.push(RowFilter {
                column: None,
                op,
                value: FilterValue::Number(value),
            });
            if lower {
                seen_lower = true;
            } else {
                seen_upper = true;
            }
        }
    }
    filters
}

/// Parse `query` against the candidate tables. `None` when no operation
/// vocabulary is present.
pub fn parse(query: &str, tables: &[&StructuredTable]) -> Option<ParsedOperation> {
    let folded = fold_accents(query);
    let operation = detect_operation(&folded)?;
    let keywords = extract_keywords(query);
    let target_column = resolve_target_column(&keywords, tables);

    let group_by_column = match operation {
        Operation::GroupBy => resolve_group_column(&folded, tables),
        Operation::Compare => find_column_by_pattern(tables, &JURISDICTION_COLUMN_RE)
            .or_else(|| find_column_by_pattern(tables, &CATEGORICAL_COLUMN_RE)),
        _ => None,
    };
    let aggregate = match operation {
        Operation::GroupBy | Operation::Compare => detect_aggregate(&folded),
        _ => Aggregate::Sum,
    };

    Some(ParsedOperation {
        operation,
        target_column,
        group_by_column,
        aggregate,
        filters: extract_row_filters(&folded, tables),
        keywords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnType, Row, TableSchema};
    use serde_json::json;

    fn table(columns: &[(&str, ColumnType)], rows: Vec<serde_json::Value>) -> StructuredTable {
        StructuredTable {
            title: "Tasas por categoría".into(),
            schema: TableSchema {
                columns: columns.iter().map(|(c, _)| c.to_string()).collect(),
                types: columns.iter().map(|(_, t)| *t).collect(),
            },
            rows: rows
                .into_iter()
                .map(|v| serde_json::from_value::<Row>(v).unwrap())
                .collect(),
            ..Default::default()
        }
    }

    fn category_table() -> StructuredTable {
        table(
            &[("category", ColumnType::String), ("amount", ColumnType::Number)],
            vec![
                json!({"category": "A", "amount": 1500}),
                json!({"category": "B", "amount": 2500}),
            ],
        )
    }

    fn op(query: &str) -> Option<Operation> {
        detect_operation(&fold_accents(query))
    }

    #[test]
    fn test_operation_detection_order() {
        assert_eq!(op("sum of amounts"), Some(Operation::Sum));
        assert_eq!(op("maximum amount"), Some(Operation::FindMaxRow));
        assert_eq!(op("¿Cuál es la tasa más alta?"), Some(Operation::FindMaxRow));
        assert_eq!(op("menor tarifa de la tabla"), Some(Operation::FindMinRow));
        assert_eq!(op("group by category, sum amount"), Some(Operation::GroupBy));
        assert_eq!(op("comparar tasas entre municipios"), Some(Operation::Compare));
        assert_eq!(op("promedio de sueldos"), Some(Operation::Avg));
        assert_eq!(op("cuántas categorías hay"), Some(Operation::Count));
        assert_eq!(op("tasas mayores a 1000"), Some(Operation::Filter));
        assert_eq!(op("valor máximo"), Some(Operation::FindMaxRow));
        assert_eq!(op("el máximo registrado"), Some(Operation::Max));
        assert_eq!(op("ordenanza de tránsito"), None);
    }

    #[test]
    fn test_extract_keywords_strips_operation_words() {
        assert_eq!(extract_keywords("sum of amounts"), vec!["amount"]);
        assert_eq!(extract_keywords("suma de las tasas viales 2025"), vec!["tasa", "vial"]);
        let kw = extract_keywords("cuánto paga un local comercial");
        assert!(kw.contains(&"paga".to_string()));
        assert!(kw.contains(&"comercial".to_string()));
    }

    #[test]
    fn test_target_column_via_keyword_and_alias() {
        let t = category_table();
        let tables = vec![&t];
        assert_eq!(
            resolve_target_column(&["amount".to_string()], &tables),
            Some("amount".to_string())
        );

        let montos = table(
            &[("concepto", ColumnType::String), ("Importe", ColumnType::Number)],
            vec![json!({"concepto": "x", "Importe": "1.200"})],
        );
        let tables = vec![&montos];
        assert_eq!(
            resolve_target_column(&["monto".to_string()], &tables),
            Some("Importe".to_string())
        );
        assert_eq!(resolve_target_column(&["zzz".to_string()], &tables), None);
    }

    #[test]
    fn test_find_column_falls_back_to_monetary_name() {
        let t = table(
            &[("detalle", ColumnType::String), ("valor_anual", ColumnType::Number)],
            vec![json!({"detalle": "x", "valor_anual": 500})],
        );
        assert_eq!(find_column(&[&t], "inexistente"), Some("valor_anual".to_string()));
    }

    #[test]
    fn test_parse_group_by_resolves_columns() {
        let t = category_table();
        let parsed = parse("group by category, sum amount", &[&t]).unwrap();
        assert_eq!(parsed.operation, Operation::GroupBy);
        assert_eq!(parsed.target_column.as_deref(), Some("amount"));
        assert_eq!(parsed.group_by_column.as_deref(), Some("category"));
        assert_eq!(parsed.aggregate, Aggregate::Sum);
        assert!(parsed.filters.is_empty());
    }

    #[test]
    fn test_parse_threshold_filters() {
        let t = category_table();
        let parsed = parse("montos entre 1.000 y 2.000", &[&t]).unwrap();
        assert_eq!(parsed.operation, Operation::Filter);
        assert_eq!(
            parsed.filters,
            vec![RowFilter {
                column: None,
                op: FilterOp::Between,
                value: FilterValue::Range(1000.0, 2000.0),
            }]
        );

        let parsed = parse("cuántas tasas mayores a 2000", &[&t]).unwrap();
        assert_eq!(parsed.operation, Operation::Count);
        assert_eq!(parsed.filters[0].op, FilterOp::Gt);
        assert_eq!(parsed.filters[0].value, FilterValue::Number(2000.0));
    }

    #[test]
    fn test_parse_category_filter() {
        let t = category_table();
        let parsed = parse("cuántas filas de categoria B", &[&t]).unwrap();
        assert_eq!(parsed.filters.len(), 1);
        assert_eq!(parsed.filters[0].column.as_deref(), Some("category"));
        assert_eq!(parsed.filters[0].value, FilterValue::Text("b".into()));
    }

    #[test]
    fn test_parse_returns_none_without_operation() {
        let t = category_table();
        assert!(parse("qué dice la ordenanza", &[&t]).is_none());
    }
}

//! Row-level operations over structured tables.
//!
//! Every numeric operation screens its column through the name denylist and
//! every cell through the plausibility guard; excluded cells are skipped.

use crate::computation::numeric::{cell_text, is_relevant_column, parse_amount, parse_number, value_number};
use crate::computation::parser::{aliases_for, Aggregate, FilterOp, FilterValue, RowFilter};
use crate::config::Plausibility;
use crate::search::tokenizer::fold_accents;
use crate::types::{NumericStats, Row, StructuredTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const UNCATEGORIZED: &str = "Sin categoría";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub table: String,
    pub count: usize,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAggregate {
    pub value: f64,
    pub count: usize,
    /// Table holding the extreme for min/max, first contributor otherwise.
    pub source_table: String,
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMatch {
    pub table: String,
    pub columns: Vec<String>,
    pub row: Row,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeRow {
    pub table: String,
    pub columns: Vec<String>,
    pub row: Row,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub group: String,
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

pub fn table_label(table: &StructuredTable) -> String {
    if table.title.trim().is_empty() {
        table.id.clone()
    } else {
        table.title.clone()
    }
}

fn has_column(table: &StructuredTable, column: &str) -> bool {
    table.schema.columns.iter().any(|c| c == column)
}

// ============================================================================
// Scalar aggregates
// ============================================================================

struct Collected {
    values: Vec<(usize, f64)>,
    contributions: Vec<Contribution>,
}

fn collect_values(tables: &[&StructuredTable], column: &str, guard: &Plausibility) -> Collected {
    let mut values = Vec::new();
    let mut contributions = Vec::new();
    if !is_relevant_column(column) {
        return Collected { values, contributions };
    }

    for (ti, table) in tables.iter().enumerate() {
        if !has_column(table, column) {
            continue;
        }
        let mut count = 0;
        let mut subtotal = 0.0;
        for row in &table.rows {
            if let Some(v) = row.get(column).and_then(|c| parse_amount(c, guard)) {
                values.push((ti, v));
                count += 1;
                subtotal += v;
            }
        }
        if count > 0 {
            contributions.push(Contribution {
                table: table_label(table),
                count,
                subtotal,
            });
        }
    }
    Collected { values, contributions }
}

pub fn sum_column(tables: &[&StructuredTable], column: &str, guard: &Plausibility) -> Option<ColumnAggregate> {
    let c = collect_values(tables, column, guard);
    let (first_table, _) = *c.values.first()?;
    Some(ColumnAggregate {
        value: c.values.iter().map(|(_, v)| v).sum(),
        count: c.values.len(),
        source_table: table_label(tables[first_table]),
        contributions: c.contributions,
    })
}

pub fn avg_column(tables: &[&StructuredTable], column: &str, guard: &Plausibility) -> Option<ColumnAggregate> {
    let mut agg = sum_column(tables, column, guard)?;
    agg.value /= agg.count as f64;
    Some(agg)
}

pub fn extreme_column(
    tables: &[&StructuredTable],
    column: &str,
    guard: &Plausibility,
    extreme: Extreme,
) -> Option<ColumnAggregate> {
    let c = collect_values(tables, column, guard);
    let mut best = *c.values.first()?;
    for &(ti, v) in &c.values[1..] {
        let better = match extreme {
            Extreme::Min => v < best.1,
            Extreme::Max => v > best.1,
        };
        if better {
            best = (ti, v);
        }
    }
    Some(ColumnAggregate {
        value: best.1,
        count: c.values.len(),
        source_table: table_label(tables[best.0]),
        contributions: c.contributions,
    })
}

/// Whole row holding the extreme plausible value. The first row wins ties.
pub fn find_extreme_row(
    tables: &[&StructuredTable],
    column: &str,
    guard: &Plausibility,
    extreme: Extreme,
) -> Option<ExtremeRow> {
    if !is_relevant_column(column) {
        return None;
    }
    let mut best: Option<(&StructuredTable, &Row, f64)> = None;
    for table in tables.iter().copied().filter(|t| has_column(t, column)) {
        for row in &table.rows {
            let Some(v) = row.get(column).and_then(|c| parse_amount(c, guard)) else {
                continue;
            };
            let better = match (&best, extreme) {
                (None, _) => true,
                (Some((_, _, b)), Extreme::Min) => v < *b,
                (Some((_, _, b)), Extreme::Max) => v > *b,
            };
            if better {
                best = Some((table, row, v));
            }
        }
    }
    best.map(|(table, row, value)| ExtremeRow {
        table: table_label(table),
        columns: table.schema.columns.clone(),
        row: row.clone(),
        value,
    })
}

// ============================================================================
// Filtering and counting
// ============================================================================

fn filter_number(value: &FilterValue) -> Option<f64> {
    match value {
        FilterValue::Number(n) => Some(*n),
        FilterValue::Text(t) => parse_number(t),
        FilterValue::Range(..) => None,
    }
}

fn filter_text(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(t) => fold_accents(t.trim()),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Range(lo, hi) => format!("{}-{}", lo, hi),
    }
}

/// Conjunction of `filters`. Filters without a column apply to `target`;
/// they fail when no target is known.
pub fn matches_filters(row: &Row, filters: &[RowFilter], target: Option<&str>) -> bool {
    filters.iter().all(|f| {
        let Some(column) = f.column.as_deref().or(target) else {
            return false;
        };
        let cell = match row.get(column) {
            None | Some(serde_json::Value::Null) => return false,
            Some(c) => c,
        };
        match f.op {
            FilterOp::Equals => match (&f.value, value_number(cell)) {
                (FilterValue::Number(n), Some(v)) => v == *n,
                _ => fold_accents(&cell_text(cell)) == filter_text(&f.value),
            },
            FilterOp::Contains => fold_accents(&cell_text(cell)).contains(&filter_text(&f.value)),
            FilterOp::Between => match (&f.value, value_number(cell)) {
                (FilterValue::Range(lo, hi), Some(v)) => v >= *lo && v <= *hi,
                _ => false,
            },
            op => {
                let (Some(v), Some(n)) = (value_number(cell), filter_number(&f.value)) else {
                    return false;
                };
                match op {
                    FilterOp::Gt => v > n,
                    FilterOp::Lt => v < n,
                    FilterOp::Gte => v >= n,
                    FilterOp::Lte => v <= n,
                    _ => false,
                }
            }
        }
    })
}

pub fn filter_rows(tables: &[&StructuredTable], filters: &[RowFilter], target: Option<&str>) -> Vec<RowMatch> {
    tables
        .iter()
        .flat_map(|table| {
            table
                .rows
                .iter()
                .filter(|row| matches_filters(row, filters, target))
                .map(|row| RowMatch {
                    table: table_label(table),
                    columns: table.schema.columns.clone(),
                    row: row.clone(),
                })
        })
        .collect()
}

/// Count rows, restricted to tables holding `column` when one is given.
pub fn count_rows(
    tables: &[&StructuredTable],
    column: Option<&str>,
    filters: &[RowFilter],
) -> (usize, Vec<Contribution>) {
    let mut total = 0;
    let mut contributions = Vec::new();
    for table in tables {
        if column.is_some_and(|c| !has_column(table, c)) {
            continue;
        }
        let count = table
            .rows
            .iter()
            .filter(|row| matches_filters(row, filters, column))
            .count();
        if count > 0 {
            contributions.push(Contribution {
                table: table_label(table),
                count,
                subtotal: count as f64,
            });
        }
        total += count;
    }
    (total, contributions)
}

// ============================================================================
// Grouping
// ============================================================================

fn aggregate_values(values: &[f64], aggregate: Aggregate) -> f64 {
    match aggregate {
        Aggregate::Sum => values.iter().sum(),
        Aggregate::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregate::Count => values.len() as f64,
    }
}

/// Buckets in first-seen order, then stably sorted by value descending.
fn into_buckets(groups: Vec<(String, Vec<f64>)>, aggregate: Aggregate) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = groups
        .into_iter()
        .map(|(group, values)| Bucket {
            value: aggregate_values(&values, aggregate),
            count: values.len(),
            group,
        })
        .collect();
    buckets.sort_by(|a, b| b.value.total_cmp(&a.value));
    buckets
}

struct Grouper {
    order: Vec<(String, Vec<f64>)>,
    index: HashMap<String, usize>,
}

impl Grouper {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push(&mut self, key: String, value: f64) {
        match self.index.get(&key) {
            Some(&i) => self.order[i].1.push(value),
            None => {
                self.index.insert(key.clone(), self.order.len());
                self.order.push((key, vec![value]));
            }
        }
    }
}

pub fn group_by_column(
    tables: &[&StructuredTable],
    group_column: &str,
    value_column: &str,
    aggregate: Aggregate,
    guard: &Plausibility,
) -> Vec<Bucket> {
    if !is_relevant_column(value_column) {
        return Vec::new();
    }
    let mut grouper = Grouper::new();
    for table in tables
        .iter()
        .filter(|t| has_column(t, group_column) && has_column(t, value_column))
    {
        for row in &table.rows {
            let Some(v) = row.get(value_column).and_then(|c| parse_amount(c, guard)) else {
                continue;
            };
            let key = row.get(group_column).map(cell_text).unwrap_or_default();
            let key = if key.is_empty() { UNCATEGORIZED.to_string() } else { key };
            grouper.push(key, v);
        }
    }
    into_buckets(grouper.order, aggregate)
}

/// Group values by originating table: its jurisdiction when tagged, its
/// title otherwise.
pub fn compare_across_tables(
    tables: &[&StructuredTable],
    value_column: &str,
    aggregate: Aggregate,
    guard: &Plausibility,
) -> Vec<Bucket> {
    if !is_relevant_column(value_column) {
        return Vec::new();
    }
    let mut grouper = Grouper::new();
    for table in tables.iter().filter(|t| has_column(t, value_column)) {
        let key = table
            .source
            .as_ref()
            .map(|s| s.jurisdiction.clone())
            .unwrap_or_else(|| table_label(table));
        for row in &table.rows {
            if let Some(v) = row.get(value_column).and_then(|c| parse_amount(c, guard)) {
                grouper.push(key.clone(), v);
            }
        }
    }
    into_buckets(grouper.order, aggregate)
}

// ============================================================================
// Relevance and statistics
// ============================================================================

const TITLE_WEIGHT: u32 = 10;
const DESCRIPTION_WEIGHT: u32 = 5;
const CONTEXT_WEIGHT: u32 = 2;
const COLUMN_WEIGHT: u32 = 5;

/// Keyword overlap score of a table. A keyword also matches through its
/// column aliases.
pub fn table_relevance(table: &StructuredTable, keywords: &[String]) -> u32 {
    let title = fold_accents(&table.title);
    let description = fold_accents(&table.description);
    let context = fold_accents(&table.context);
    let columns: Vec<String> = table.schema.columns.iter().map(|c| fold_accents(c)).collect();

    let mut score = 0;
    for kw in keywords.iter().filter(|k| k.chars().count() >= 3) {
        let mut terms: Vec<&str> = vec![kw.as_str()];
        terms.extend(aliases_for(kw).iter().copied());
        let hit = |text: &str| terms.iter().any(|t| text.contains(t));

        if hit(title.as_str()) {
            score += TITLE_WEIGHT;
        }
        if hit(description.as_str()) {
            score += DESCRIPTION_WEIGHT;
        }
        if hit(context.as_str()) {
            score += CONTEXT_WEIGHT;
        }
        score += COLUMN_WEIGHT * columns.iter().filter(|c| hit(c.as_str())).count() as u32;
    }
    score
}

/// Tables ranked by relevance, zero scores dropped. Without keywords every
/// table is kept in input order.
pub fn rank_tables<'a>(tables: &'a [StructuredTable], keywords: &[String]) -> Vec<&'a StructuredTable> {
    if keywords.is_empty() {
        return tables.iter().collect();
    }
    let mut scored: Vec<(u32, &StructuredTable)> = tables
        .iter()
        .map(|t| (table_relevance(t, keywords), t))
        .filter(|(s, _)| *s > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, t)| t).collect()
}

/// Per-column statistics computed from the rows with the same screening the
/// aggregates use.
pub fn derive_numeric_stats(table: &StructuredTable, guard: &Plausibility) -> BTreeMap<String, NumericStats> {
    let mut stats = BTreeMap::new();
    for column in table.numeric_columns().filter(|c| is_relevant_column(c)) {
        let values: Vec<f64> = table
            .rows
            .iter()
            .filter_map(|r| r.get(column).and_then(|c| parse_amount(c, guard)))
            .collect();
        if values.is_empty() {
            continue;
        }
        let sum: f64 = values.iter().sum();
        stats.insert(
            column.to_string(),
            NumericStats {
                sum,
                max: aggregate_values(&values, Aggregate::Max),
                min: aggregate_values(&values, Aggregate::Min),
                avg: sum / values.len() as f64,
                count: values.len(),
            },
        );
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnType, TableSchema, TableSource};
    use serde_json::json;

    fn rows(values: Vec<serde_json::Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    fn category_table() -> StructuredTable {
        StructuredTable {
            title: "Tasas por categoría".into(),
            schema: TableSchema {
                columns: vec!["category".into(), "amount".into()],
                types: vec![ColumnType::String, ColumnType::Number],
            },
            rows: rows(vec![
                json!({"category": "A", "amount": 1500}),
                json!({"category": "B", "amount": "2.500"}),
                json!({"category": "C", "amount": 800}),
                json!({"category": "D", "amount": "500,00"}),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn test_sum_avg_min_max() {
        let t = category_table();
        let g = Plausibility::default();
        let tables = [&t];
        assert_eq!(sum_column(&tables, "amount", &g).unwrap().value, 5300.0);
        assert_eq!(avg_column(&tables, "amount", &g).unwrap().value, 1325.0);
        assert_eq!(extreme_column(&tables, "amount", &g, Extreme::Min).unwrap().value, 500.0);
        let max = extreme_column(&tables, "amount", &g, Extreme::Max).unwrap();
        assert_eq!(max.value, 2500.0);
        assert_eq!(max.source_table, "Tasas por categoría");
    }

    #[test]
    fn test_implausible_values_are_excluded() {
        let mut t = category_table();
        t.rows.push(rows(vec![json!({"category": "E", "amount": 3})]).remove(0));
        t.rows.push(rows(vec![json!({"category": "F", "amount": "n/d"})]).remove(0));
        let g = Plausibility::default();
        let sum = sum_column(&[&t], "amount", &g).unwrap();
        assert_eq!(sum.value, 5300.0);
        assert_eq!(sum.count, 4);
    }

    #[test]
    fn test_denylisted_column_yields_nothing() {
        let mut t = category_table();
        t.schema.columns.push("codigo".into());
        t.rows[0].insert("codigo".into(), json!(1234));
        assert!(sum_column(&[&t], "codigo", &Plausibility::default()).is_none());
    }

    #[test]
    fn test_find_extreme_row() {
        let t = category_table();
        let row = find_extreme_row(&[&t], "amount", &Plausibility::default(), Extreme::Max).unwrap();
        assert_eq!(row.row["category"], json!("B"));
        assert_eq!(row.value, 2500.0);
    }

    #[test]
    fn test_group_by_sorted_descending() {
        let t = category_table();
        let buckets = group_by_column(&[&t], "category", "amount", Aggregate::Sum, &Plausibility::default());
        let order: Vec<(&str, f64)> = buckets.iter().map(|b| (b.group.as_str(), b.value)).collect();
        assert_eq!(order, vec![("B", 2500.0), ("A", 1500.0), ("C", 800.0), ("D", 500.0)]);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let t = category_table();
        let filters = vec![
            RowFilter {
                column: None,
                op: FilterOp::Gte,
                value: FilterValue::Number(800.0),
            },
            RowFilter {
                column: Some("category".into()),
                op: FilterOp::Contains,
                value: FilterValue::Text("c".into()),
            },
        ];
        let matched = filter_rows(&[&t], &filters, Some("amount"));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].row["category"], json!("C"));

        let between = vec![RowFilter {
            column: Some("amount".into()),
            op: FilterOp::Between,
            value: FilterValue::Range(500.0, 1500.0),
        }];
        assert_eq!(count_rows(&[&t], Some("amount"), &between).0, 3);
        // Column-less filters need a target.
        assert!(filter_rows(&[&t], &filters, None).is_empty());
    }

    #[test]
    fn test_compare_across_tables_uses_source_jurisdiction() {
        let mut a = category_table();
        a.source = Some(TableSource {
            document_id: "d1".into(),
            jurisdiction: "Merlo".into(),
            title: "Boletín".into(),
        });
        let mut b = category_table();
        b.rows.truncate(1);
        b.source = Some(TableSource {
            document_id: "d2".into(),
            jurisdiction: "Carlos Tejedor".into(),
            title: "Boletín".into(),
        });
        let buckets = compare_across_tables(&[&a, &b], "amount", Aggregate::Sum, &Plausibility::default());
        assert_eq!(buckets[0].group, "Merlo");
        assert_eq!(buckets[1].group, "Carlos Tejedor");
        assert_eq!(buckets[1].value, 1500.0);
    }

    #[test]
    fn test_rank_tables_weights() {
        let mut salaries = category_table();
        salaries.title = "Escala salarial".into();
        salaries.description = "Sueldos del personal".into();
        let mut fees = category_table();
        fees.title = "Tasa vial".into();
        fees.schema.columns = vec!["zona".into(), "tasa".into()];
        let mut unrelated = category_table();
        unrelated.title = "Padrón".into();
        unrelated.schema.columns = vec!["nombre".into()];

        let tables = vec![unrelated, fees, salaries];
        assert_eq!(table_relevance(&tables[1], &["tasa".to_string()]), 10 + 5);
        let ranked = rank_tables(&tables, &["tasa".to_string()]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "Tasa vial");
        assert_eq!(rank_tables(&tables, &[]).len(), 3);
    }

    #[test]
    fn test_numeric_stats_match_engine_sum() {
        let t = category_table();
        let g = Plausibility::default();
        let stats = derive_numeric_stats(&t, &g);
        let amount = stats["amount"];
        assert_eq!(amount.sum, sum_column(&[&t], "amount", &g).unwrap().value);
        assert_eq!(amount.count, 4);
        assert_eq!(amount.max, 2500.0);
        assert_eq!(amount.min, 500.0);
    }
}

//! Markdown rendering for computation answers and table summaries.

use crate::computation::numeric::{cell_text, format_number};
use crate::computation::table_engine::{Bucket, Contribution, RowMatch};
use crate::types::{Row, StructuredTable};
use std::collections::HashSet;

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

fn render_cell(row: &Row, column: &str) -> String {
    row.get(column).map(|v| escape(&cell_text(v))).unwrap_or_default()
}

fn header(columns: &[String]) -> Vec<String> {
    vec![
        format!("| {} |", columns.iter().map(|c| escape(c)).collect::<Vec<_>>().join(" | ")),
        format!("| {} |", columns.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")),
    ]
}

pub fn row_markdown(columns: &[String], row: &Row) -> String {
    let mut lines = header(columns);
    let cells: Vec<String> = columns.iter().map(|c| render_cell(row, c)).collect();
    lines.push(format!("| {} |", cells.join(" | ")));
    lines.join("\n")
}

/// Rows rendered with the columns of the first match, capped at `max_rows`.
pub fn rows_markdown(rows: &[RowMatch], max_rows: usize) -> String {
    let Some(first) = rows.first() else {
        return "*No se encontraron resultados*".to_string();
    };
    let mut lines = header(&first.columns);
    for m in rows.iter().take(max_rows) {
        let cells: Vec<String> = first.columns.iter().map(|c| render_cell(&m.row, c)).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    if rows.len() > max_rows {
        lines.push(format!("\n_… y {} filas más._", rows.len() - max_rows));
    }
    lines.join("\n")
}

pub fn buckets_markdown(buckets: &[Bucket], label: &str) -> String {
    if buckets.is_empty() {
        return "*No se encontraron datos*".to_string();
    }
    let mut lines = vec![format!("| Grupo | {} | Cantidad |", escape(label)), "|---|---|---|".to_string()];
    for b in buckets {
        lines.push(format!("| {} | ${} | {} |", escape(&b.group), format_number(b.value), b.count));
    }
    lines.join("\n")
}

pub fn contributions_markdown(contributions: &[Contribution]) -> String {
    let mut lines = vec!["| Tabla | Valores | Subtotal |".to_string(), "|---|---|---|".to_string()];
    for c in contributions {
        lines.push(format!("| {} | {} | {} |", escape(&c.table), c.count, format_number(c.subtotal)));
    }
    lines.join("\n")
}

/// Overview of the available tables with their precomputed statistics. Tables
/// repeated across bulletins are listed once, by title.
pub fn tables_summary(tables: &[StructuredTable]) -> String {
    if tables.is_empty() {
        return "*No hay tablas disponibles*".to_string();
    }
    let mut lines = vec!["## Resumen de tablas disponibles".to_string(), String::new()];
    let mut seen = HashSet::new();
    for table in tables.iter().filter(|t| seen.insert(t.title.as_str())) {
        lines.push(format!("### {}", table.title));
        if !table.description.is_empty() {
            lines.push(format!("*{}*", table.description));
        }
        let rows = if table.stats.row_count > 0 { table.stats.row_count } else { table.rows.len() };
        lines.push(format!("- **Filas:** {}", rows));
        lines.push(format!("- **Columnas:** {}", table.schema.columns.join(", ")));
        if !table.stats.numeric_stats.is_empty() {
            lines.push("- **Columnas numéricas:**".to_string());
            for (column, s) in &table.stats.numeric_stats {
                lines.push(format!(
                    "  - {}: suma={}, máx={}, mín={}, prom={}",
                    column,
                    format_number(s.sum),
                    format_number(s.max),
                    format_number(s.min),
                    format_number(s.avg)
                ));
            }
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NumericStats, TableSchema};
    use serde_json::json;

    #[test]
    fn test_row_markdown_formats_numbers() {
        let row: Row = serde_json::from_value(json!({"category": "B", "amount": 2500})).unwrap();
        let md = row_markdown(&["category".into(), "amount".into()], &row);
        assert_eq!(md, "| category | amount |\n| --- | --- |\n| B | 2.500 |");
    }

    #[test]
    fn test_buckets_markdown() {
        let md = buckets_markdown(
            &[Bucket {
                group: "B".into(),
                value: 2500.0,
                count: 1,
            }],
            "amount",
        );
        assert!(md.contains("| B | $2.500 | 1 |"));
    }

    #[test]
    fn test_tables_summary_lists_stats() {
        let mut table = StructuredTable {
            title: "Tasas".into(),
            schema: TableSchema {
                columns: vec!["monto".into()],
                types: vec![],
            },
            ..Default::default()
        };
        table.stats.row_count = 2;
        table.stats.numeric_stats.insert(
            "monto".into(),
            NumericStats {
                sum: 3000.0,
                max: 2000.0,
                min: 1000.0,
                avg: 1500.0,
                count: 2,
            },
        );
        let summary = tables_summary(&[table]);
        assert!(summary.contains("### Tasas"));
        assert!(summary.contains("- **Filas:** 2"));
        assert!(summary.contains("monto: suma=3.000, máx=2.000, mín=1.000, prom=1.500"));
    }
}

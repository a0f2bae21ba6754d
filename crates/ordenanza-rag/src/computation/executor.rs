//! Computation entry point: rank tables, parse the question, execute the
//! operation and render a Spanish markdown answer.
//!
//! Every failure is reported through [`ComputeAnswer::error_code`]; nothing
//! here returns `Err` to the caller or panics on bad data.

use crate::computation::format::{buckets_markdown, contributions_markdown, row_markdown, rows_markdown};
use crate::computation::numeric::{cell_text, format_number};
use crate::computation::parser::{self, extract_keywords, find_column, Aggregate, Operation, ParsedOperation};
use crate::computation::table_engine::{
    avg_column, compare_across_tables, count_rows, extreme_column, filter_rows, find_extreme_row,
    group_by_column, rank_tables, sum_column, table_label, Bucket, ColumnAggregate, Contribution, Extreme,
    ExtremeRow, RowMatch,
};
use crate::config::ComputationConfig;
use crate::error::{ComputeError, ComputeErrorCode};
use crate::search::tokenizer::fold_accents;
use crate::types::{StructuredTable, TableSource};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Column that names the entity a row describes.
static ENTITY_COLUMN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"municipio|partido|jurisdic|categor|tipo|descri|concepto|rubro|nombre|name|category")
        .expect("entity column regex is valid")
});

/// Rows shown when a filter question carries no usable predicate.
const PREVIEW_ROWS: usize = 10;

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationResult {
    Aggregate {
        operation: Operation,
        column: String,
        aggregate: ColumnAggregate,
    },
    Count {
        column: Option<String>,
        count: usize,
        contributions: Vec<Contribution>,
    },
    Row {
        operation: Operation,
        column: String,
        found: ExtremeRow,
    },
    Rows {
        column: Option<String>,
        rows: Vec<RowMatch>,
    },
    Groups {
        operation: Operation,
        group_column: Option<String>,
        value_column: String,
        aggregate: Aggregate,
        buckets: Vec<Bucket>,
        explanation: Option<String>,
    },
}

impl ComputationResult {
    /// Label of the table the answer came from, when it came from one.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Aggregate { aggregate, .. } => Some(&aggregate.source_table),
            Self::Row { found, .. } => Some(&found.table),
            Self::Rows { rows, .. } => rows.first().map(|r| r.table.as_str()),
            Self::Count { contributions, .. } => contributions.first().map(|c| c.table.as_str()),
            Self::Groups { .. } => None,
        }
    }

    fn numbers(&self) -> Vec<f64> {
        match self {
            Self::Aggregate { aggregate, .. } => vec![aggregate.value],
            Self::Row { found, .. } => vec![found.value],
            Self::Groups { buckets, .. } => buckets.iter().map(|b| b.value).collect(),
            Self::Count { .. } | Self::Rows { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeAnswer {
    pub success: bool,
    pub answer: String,
    pub table: Option<String>,
    pub error_code: Option<ComputeErrorCode>,
    pub operation: Option<Operation>,
    pub result: Option<ComputationResult>,
}

impl ComputeAnswer {
    fn failure(operation: Option<Operation>, error: ComputeError) -> Self {
        Self {
            success: false,
            answer: error.message,
            table: None,
            error_code: Some(error.code),
            operation,
            result: None,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ComputationEngine {
    config: ComputationConfig,
}

impl ComputationEngine {
    pub fn new(config: ComputationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComputationConfig {
        &self.config
    }

    pub fn parse(&self, query: &str, tables: &[&StructuredTable]) -> Option<ParsedOperation> {
        parser::parse(query, tables)
    }

    /// Answer an aggregation question over `tables`.
    pub fn compute_aggregate(&self, query: &str, tables: &[StructuredTable]) -> ComputeAnswer {
        if tables.is_empty() {
            return ComputeAnswer::failure(
                None,
                ComputeError::new(
                    ComputeErrorCode::NoTables,
                    "No hay tablas estructuradas disponibles para realizar cómputos.",
                ),
            );
        }

        let keywords = extract_keywords(query);
        let relevant = rank_tables(tables, &keywords);
        if relevant.is_empty() {
            return ComputeAnswer::failure(
                None,
                ComputeError::new(
                    ComputeErrorCode::NoRelevantTables,
                    "No se encontraron tablas relevantes para esta consulta.",
                ),
            );
        }

        let Some(parsed) = self.parse(query, &relevant) else {
            return ComputeAnswer::failure(
                None,
                ComputeError::new(
                    ComputeErrorCode::ParseError,
                    "No pude entender qué operación de cómputo deseas realizar. \
                     Intenta reformular la pregunta (ej: \"¿cuál es la suma de todas las tasas?\").",
                ),
            );
        };
        tracing::debug!(
            operation = ?parsed.operation,
            column = ?parsed.target_column,
            tables = relevant.len(),
            "Parsed computation"
        );

        match self.execute(&parsed, &relevant) {
            Ok(result) => ComputeAnswer {
                success: true,
                answer: self.render(&result),
                table: result.table().map(str::to_string),
                error_code: None,
                operation: Some(parsed.operation),
                result: Some(result),
            },
            Err(e) => {
                tracing::debug!(code = %e.code, "Computation produced no answer");
                ComputeAnswer::failure(Some(parsed.operation), e)
            }
        }
    }

    /// Run a parsed operation. Row filters only narrow count and filter
    /// operations.
    pub fn execute(
        &self,
        parsed: &ParsedOperation,
        tables: &[&StructuredTable],
    ) -> Result<ComputationResult, ComputeError> {
        let guard = &self.config.plausibility;

        if parsed.operation == Operation::Count {
            return Ok(count(parsed, tables));
        }

        let column = parsed
            .target_column
            .clone()
            .or_else(|| find_column(tables, parsed.keywords.first().map(String::as_str).unwrap_or("monto")))
            .ok_or_else(|| {
                ComputeError::new(
                    ComputeErrorCode::NoColumnIdentified,
                    "No pude identificar qué columna de la tabla deseas consultar. \
                     Por favor sé más específico (ej: \"¿cuál es la suma de las tasas viales?\").",
                )
            })?;

        let no_data = || {
            ComputeError::new(
                ComputeErrorCode::NoData,
                format!(
                    "No se encontraron valores numéricos válidos en la columna \"{}\" de los datos disponibles.",
                    column
                ),
            )
        };

        let result = match parsed.operation {
            Operation::Sum | Operation::Avg | Operation::Min | Operation::Max => {
                let aggregate = match parsed.operation {
                    Operation::Sum => sum_column(tables, &column, guard),
                    Operation::Avg => avg_column(tables, &column, guard),
                    Operation::Min => extreme_column(tables, &column, guard, Extreme::Min),
                    _ => extreme_column(tables, &column, guard, Extreme::Max),
                }
                .ok_or_else(no_data)?;
                ComputationResult::Aggregate {
                    operation: parsed.operation,
                    column: column.clone(),
                    aggregate,
                }
            }
            Operation::FindMinRow | Operation::FindMaxRow => {
                let extreme = if parsed.operation == Operation::FindMinRow {
                    Extreme::Min
                } else {
                    Extreme::Max
                };
                let found = find_extreme_row(tables, &column, guard, extreme).ok_or_else(no_data)?;
                ComputationResult::Row {
                    operation: parsed.operation,
                    column: column.clone(),
                    found,
                }
            }
            Operation::Filter => {
                let rows = if parsed.filters.is_empty() {
                    preview_rows(tables)
                } else {
                    filter_rows(tables, &parsed.filters, Some(&column))
                };
                if rows.is_empty() {
                    return Err(ComputeError::new(
                        ComputeErrorCode::NoResults,
                        "No se encontraron resultados que coincidan con los criterios.",
                    ));
                }
                ComputationResult::Rows {
                    column: Some(column.clone()),
                    rows,
                }
            }
            Operation::GroupBy => {
                let group_column = parsed.group_by_column.clone().ok_or_else(|| {
                    ComputeError::new(
                        ComputeErrorCode::NoGroupColumn,
                        "No se pudo identificar una columna para agrupar los datos.",
                    )
                })?;
                let buckets = group_by_column(tables, &group_column, &column, parsed.aggregate, guard);
                if buckets.is_empty() {
                    return Err(no_data());
                }
                ComputationResult::Groups {
                    operation: Operation::GroupBy,
                    group_column: Some(group_column),
                    value_column: column.clone(),
                    aggregate: parsed.aggregate,
                    buckets,
                    explanation: None,
                }
            }
            Operation::Compare => {
                let buckets = match &parsed.group_by_column {
                    Some(group) => group_by_column(tables, group, &column, parsed.aggregate, guard),
                    None => compare_across_tables(tables, &column, parsed.aggregate, guard),
                };
                if buckets.is_empty() {
                    return Err(no_data());
                }
                let explanation = explain_comparison(&buckets);
                ComputationResult::Groups {
                    operation: Operation::Compare,
                    group_column: parsed.group_by_column.clone(),
                    value_column: column.clone(),
                    aggregate: parsed.aggregate,
                    buckets,
                    explanation,
                }
            }
            Operation::Count => count(parsed, tables),
        };

        if result.numbers().iter().any(|v| !v.is_finite()) {
            return Err(ComputeError::new(
                ComputeErrorCode::ExecutionError,
                "Error al ejecutar la operación: el resultado no es un número válido.",
            ));
        }
        Ok(result)
    }

    fn render(&self, result: &ComputationResult) -> String {
        match result {
            ComputationResult::Aggregate {
                operation, aggregate, ..
            } => {
                let label = match operation {
                    Operation::Avg => "Promedio",
                    Operation::Min => "Mínimo",
                    Operation::Max => "Máximo",
                    _ => "Total",
                };
                let mut answer = format!("**{}:** {}", label, format_number(aggregate.value));
                if aggregate.contributions.len() > 1 {
                    answer.push_str("\n\n");
                    answer.push_str(&contributions_markdown(&aggregate.contributions));
                }
                answer
            }
            ComputationResult::Count { count, .. } => format!("**Cantidad:** {}", count),
            ComputationResult::Row { operation, found, .. } => {
                let label = if *operation == Operation::FindMinRow {
                    "Valor mínimo"
                } else {
                    "Valor máximo"
                };
                let entity = found
                    .columns
                    .iter()
                    .find(|c| ENTITY_COLUMN_RE.is_match(&fold_accents(c)))
                    .and_then(|c| found.row.get(c).map(|v| (c.as_str(), cell_text(v))))
                    .filter(|(_, v)| !v.is_empty());
                let heading = match entity {
                    Some((column, value)) => format!("**{}**: {}", column, value),
                    None => format!("**Registro**: {}", found.table),
                };
                format!(
                    "{}\n**{}**: {}\n\n{}",
                    heading,
                    label,
                    format_number(found.value),
                    row_markdown(&found.columns, &found.row)
                )
            }
            ComputationResult::Rows { rows, .. } => format!(
                "**Encontrados {} resultados:**\n\n{}",
                rows.len(),
                rows_markdown(rows, self.config.max_rows_shown)
            ),
            ComputationResult::Groups {
                operation,
                group_column,
                value_column,
                buckets,
                explanation,
                ..
            } => {
                let heading = match (operation, group_column) {
                    (Operation::GroupBy, Some(g)) => format!("**Agrupado por {}:**", g),
                    (_, Some(g)) => format!("**Comparación por {}:**", g),
                    (_, None) => "**Comparación de valores:**".to_string(),
                };
                let mut answer = format!("{}\n\n{}", heading, buckets_markdown(buckets, value_column));
                if let Some(text) = explanation {
                    answer.push_str("\n\n");
                    answer.push_str(text);
                }
                answer
            }
        }
    }
}

/// Count never needs a column; a resolved target only restricts which
/// tables take part.
fn count(parsed: &ParsedOperation, tables: &[&StructuredTable]) -> ComputationResult {
    let column = parsed.target_column.clone();
    let (count, contributions) = count_rows(tables, column.as_deref(), &parsed.filters);
    ComputationResult::Count {
        column,
        count,
        contributions,
    }
}

fn preview_rows(tables: &[&StructuredTable]) -> Vec<RowMatch> {
    tables
        .first()
        .map(|table| {
            table
                .rows
                .iter()
                .take(PREVIEW_ROWS)
                .map(|row| RowMatch {
                    table: table_label(table),
                    columns: table.schema.columns.clone(),
                    row: row.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Largest and smallest groups and their gap. Buckets arrive sorted descending.
fn explain_comparison(buckets: &[Bucket]) -> Option<String> {
    let (first, last) = (buckets.first()?, buckets.last()?);
    if buckets.len() < 2 {
        return None;
    }
    Some(format!(
        "Mayor: {} (${}). Menor: {} (${}). Diferencia: ${}.",
        first.group,
        format_number(first.value),
        last.group,
        format_number(last.value),
        format_number(first.value - last.value)
    ))
}

/// Tag every table with the document it was extracted from.
pub fn tag_tables(tables: Vec<StructuredTable>, source: &TableSource) -> Vec<StructuredTable> {
    tables
        .into_iter()
        .map(|mut t| {
            t.source = Some(source.clone());
            t
        })
        .collect()
}

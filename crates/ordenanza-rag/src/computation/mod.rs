//! Deterministic arithmetic over structured tables: sum, average, extremes,
//! counts, filters, grouping and cross-jurisdiction comparison.

pub mod executor;
pub mod format;
pub mod numeric;
pub mod parser;
pub mod table_engine;

pub use executor::{tag_tables, ComputationEngine, ComputationResult, ComputeAnswer};
pub use format::tables_summary;
pub use numeric::{format_number, parse_number};
pub use parser::{Aggregate, FilterOp, FilterValue, Operation, ParsedOperation, RowFilter};
pub use table_engine::{derive_numeric_stats, rank_tables};

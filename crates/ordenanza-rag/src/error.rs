use serde::{Deserialize, Serialize};
use std::fmt;

/// Infrastructure failures: the corpus or its tables could not be produced.
///
/// These are distinct from [`ComputeError`], which describes a query the engine
/// understood but could not answer from the data it was given.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to load corpus: {0}")]
    CorpusLoad(#[source] anyhow::Error),

    #[error("failed to load content for document {id}: {source}")]
    ContentLoad {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load tables for document {id}: {source}")]
    TableLoad {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("index build failed: {0}")]
    IndexBuild(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Stable codes reported to callers of the computation entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputeErrorCode {
    NoTables,
    NoRelevantTables,
    ParseError,
    NoColumnIdentified,
    ExecutionError,
    NoData,
    NoResults,
    NoGroupColumn,
}

impl ComputeErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeErrorCode::NoTables => "NO_TABLES",
            ComputeErrorCode::NoRelevantTables => "NO_RELEVANT_TABLES",
            ComputeErrorCode::ParseError => "PARSE_ERROR",
            ComputeErrorCode::NoColumnIdentified => "NO_COLUMN_IDENTIFIED",
            ComputeErrorCode::ExecutionError => "EXECUTION_ERROR",
            ComputeErrorCode::NoData => "NO_DATA",
            ComputeErrorCode::NoResults => "NO_RESULTS",
            ComputeErrorCode::NoGroupColumn => "NO_GROUP_COLUMN",
        }
    }
}

impl fmt::Display for ComputeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ComputeError {
    pub code: ComputeErrorCode,
    pub message: String,
}

impl ComputeError {
    pub fn new(code: ComputeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_serialize_as_wire_strings() {
        let json = serde_json::to_string(&ComputeErrorCode::NoRelevantTables).unwrap();
        assert_eq!(json, "\"NO_RELEVANT_TABLES\"");
        assert_eq!(ComputeErrorCode::NoGroupColumn.to_string(), "NO_GROUP_COLUMN");
    }

    #[test]
    fn test_engine_error_keeps_document_id() {
        let err = EngineError::ContentLoad {
            id: "doc-7".into(),
            source: anyhow::anyhow!("timeout"),
        };
        let text = err.to_string();
        assert!(text.contains("doc-7"));
        assert!(text.contains("timeout"));
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ColumnName, TableName};

/// Error type for measurement parsing, table alignment, and aggregation failures.
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("format error in '{origin}' at line {line}: {reason}")]
    Format {
        origin: String,
        line: usize,
        reason: String,
    },
    #[error("invalid raw image '{}': {reason}", .path.display())]
    Image { path: PathBuf, reason: String },
    #[error("aggregation error: {0}")]
    Aggregation(String),
    #[error("table '{table}' not found in measurement")]
    MissingTable { table: TableName },
    #[error("column '{column}' not found in table '{table}'")]
    MissingColumn { table: TableName, column: ColumnName },
    #[error("column '{column}' holds non-numeric value '{value}'")]
    InvalidValue { column: ColumnName, value: String },
    #[error("table '{table}' expects {expected} values per row, got {found}")]
    RowWidth {
        table: TableName,
        expected: usize,
        found: usize,
    },
    #[error("join would duplicate column '{column}'")]
    DuplicateColumn { column: ColumnName },
    #[error("clock drift fit failed: {0}")]
    ClockFit(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

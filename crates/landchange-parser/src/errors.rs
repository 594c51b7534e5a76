use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported table format for {0}; expected .csv or .parquet")]
    UnsupportedFormat(PathBuf),

    #[error("{table} is missing column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table} row {row} has no value in '{column}'")]
    NullValue {
        table: String,
        row: usize,
        column: String,
    },

    #[error("{table} column '{column}' does not carry a valid date: {message}")]
    InvalidDate {
        table: String,
        column: String,
        message: String,
    },

    #[error("{table} row {row} has year {value}, which does not fit a calendar year")]
    YearOutOfRange { table: String, row: usize, value: i64 },

    #[error("{table} date columns are not strictly chronological at '{column}'")]
    UnorderedDates { table: String, column: String },

    #[error("{table} has no columns matching the observation date pattern")]
    NoDateColumns { table: String },
}

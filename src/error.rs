use std::path::PathBuf;

use thiserror::Error;

/// Why a dataset could not be loaded. Loading is all-or-nothing: any of these
/// aborts the load and no partial table is produced.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}, column '{column}': cannot parse '{value}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("reading file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("parsing JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reading parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("reading arrow batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Failure while writing the filtered view back out.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("writing file: {0}")]
    Io(#[from] std::io::Error),
}

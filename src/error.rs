//! Error types for loading, oracle calls, replacement and the overall run.
//!
//! Only [`ProcessError`] is fatal to a run. Oracle and replacement errors are
//! absorbed inside the pipeline and never reach the caller.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file type '{0}' (expected csv, xlsx, xls or excel)")]
    UnknownFormat(String),
    #[error("Cannot infer file type from {0:?}")]
    UndetectedFormat(PathBuf),
    #[error("Error reading file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error reading file {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to decode {path:?} as {encoding} (row {row})")]
    Encoding {
        path: PathBuf,
        encoding: &'static str,
        row: usize,
    },
    #[error("Error reading workbook {path:?}: {message}")]
    Workbook { path: PathBuf, message: String },
    #[error("Workbook {path:?} has no worksheet '{sheet}'")]
    MissingSheet { path: PathBuf, sheet: String },
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Pattern oracle unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed oracle reply: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ReplacementError {
    #[error("Column '{column}' row {row} holds an unsupported value ({value})")]
    UnsupportedValue {
        column: String,
        row: usize,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("No textual columns found in the dataset")]
    NoTextualColumns,
    #[error("An API key is required when the pattern oracle is enabled")]
    MissingCredential,
}

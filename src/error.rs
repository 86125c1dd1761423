//! Error types for parsing, computation and report output.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a cycle or a run.
#[derive(Error, Debug)]
pub enum Error {
    /// A configured path was left empty when starting.
    #[error("no {0} file specified")]
    MissingPath(&'static str),

    /// An input is missing/unreadable or the report path is not writable.
    #[error("cannot use {}: {reason}", path.display())]
    Validation { path: PathBuf, reason: String },

    /// The delimited format itself could not be read.
    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),

    /// A field reaching the calculator was absent or not numeric.
    #[error("row {row}: {detail}")]
    Computation { row: String, detail: String },

    /// The report could not be written; the previous report is untouched.
    #[error("failed to write report {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Other file I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn computation(row: &str, detail: impl Into<String>) -> Self {
        Error::Computation {
            row: row.trim().to_string(),
            detail: detail.into(),
        }
    }

    /// Whether this error ends the run (as opposed to skipping it up front).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::MissingPath(_) | Error::Validation { .. })
    }
}

//! CSV dataset loading.
//!
//! Rows are coerced by [`record::coerce_record`] under one explicit
//! [`LoadPolicy`]; the in-memory backend collects them into an
//! [`InstallationTable`], while the import pipeline streams them to
//! PostgreSQL.

pub mod record;
pub mod table;

use std::path::PathBuf;

use serde::Deserialize;

pub use record::{coerce_record, CsvColumns, RowError};
pub use table::{InstallationTable, LoadReport, TableHandle};

/// What to do with a row whose required fields fail numeric coercion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Count the row as an error and drop it.
    SkipInvalid,
    /// Keep the row with the offending fields set to null.
    #[default]
    NullSubstitute,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read CSV headers: {0}")]
    Headers(#[source] csv::Error),
    #[error("CSV header has no case_id column")]
    MissingIdentifierColumn,
    #[error("failed to read CSV record: {0}")]
    Record(#[source] csv::Error),
}

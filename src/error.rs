//! Typed failures surfaced by the loading and query pipeline.
//!
//! Fatal conditions abort a run and reach the caller as [`QueryError`].
//! Recoverable conditions (a rejected row, a date that will not reformat)
//! never become errors; they are logged and counted in
//! [`LoadReport`](crate::load::LoadReport).

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures reported by an [`SqlEngine`](crate::engine::SqlEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Workspace I/O error: {0}")]
    Workspace(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Positional column types and named column types cannot be supplied together")]
    ConfigurationConflict,
    #[error(
        "Unknown column type '{0}' (expected one of: {expected})",
        expected = crate::classify::ColumnType::variants().join(", ")
    )]
    InvalidColumnType(String),
    #[error(
        "Invalid column name '{0}' (expected c1 to c{max})",
        max = crate::registry::MAX_COLUMNS
    )]
    InvalidColumnName(String),
    #[error("Input file {path:?} is unavailable")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed reading line {line} of {path:?}")]
    InputRead {
        path: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("Unable to initialize the SQL workspace")]
    EngineConnection(#[source] EngineError),
    #[error("Schema statement rejected: {statement}")]
    Schema {
        statement: String,
        #[source]
        source: EngineError,
    },
    #[error("Query execution failed: {query}")]
    Query {
        query: String,
        #[source]
        source: EngineError,
    },
}

/// A value classified as a date during sampling no longer parses with the
/// detected pattern at load time.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{value}' does not match the {pattern} date pattern")]
pub struct DateReformatError {
    pub value: String,
    pub pattern: &'static str,
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

//! Error types for the SQL crate.

use thiserror::Error;

/// Errors raised while preparing a statement for execution.
#[derive(Debug, Error)]
pub enum SqlError {
    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    ParseError(String),

    /// Nothing left to run after cleaning.
    #[error("query is empty")]
    EmptyQuery,

    /// More than one statement was submitted.
    #[error("expected a single SQL statement, got {0}")]
    MultipleStatements(usize),

    /// The statement references a table outside the allow-list.
    #[error("Table {table} not found. Available tables: {available}")]
    TableNotAllowed { table: String, available: String },
}

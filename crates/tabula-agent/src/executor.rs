//! Contracts for the external collaborators: the SQL executor and the
//! per-source schema introspector.
//!
//! The agent only ever reads a [`QueryResult`]: ordered column descriptors
//! and ordered rows of JSON values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_sql::Statement;

/// Name and declared type of a result or table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared SQL type; empty when the source does not report one.
    #[serde(default)]
    pub data_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Tabular result returned by a [`QueryExecutor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Ordered row tuples.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First-column values rendered as strings, as produced by `SHOW ...`
    /// statements.
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Runs parsed statements against a data source.
///
/// Implementations must understand `SHOW DATABASES` and `SHOW TABLES` in
/// addition to ordinary queries; catalog discovery relies on both.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, statement: &Statement, database: &str) -> anyhow::Result<QueryResult>;
}

/// Reports the columns of a table within one data source.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    async fn columns(&self, database: &str, table: &str) -> anyhow::Result<Vec<ColumnDescriptor>>;
}

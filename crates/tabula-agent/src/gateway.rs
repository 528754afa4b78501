//! Guarded query execution.
//!
//! Every statement passes through here on its way to the executor:
//! cleaned, parsed, checked against the allow-list, then dispatched.

use crate::error::{AgentError, Result};
use crate::executor::{QueryExecutor, QueryResult};
use crate::format::ResultFormatter;
use std::sync::Arc;
use tabula_core::TableIdentifier;
use tabula_core::identifier::quote_ident;
use tabula_sql::SqlAnalyzer;

/// Shown in place of sample rows when sampling fails.
pub const SAMPLE_ROWS_PLACEHOLDER: &str = "\t [error] Couldn't retrieve sample rows!";

pub struct QueryGateway {
    executor: Arc<dyn QueryExecutor>,
    analyzer: SqlAnalyzer,
    include_tables: Vec<String>,
    formatter: ResultFormatter,
}

impl QueryGateway {
    /// Create a gateway. A non-empty `include_tables` restricts every query to
    /// those tables.
    pub fn new(executor: Arc<dyn QueryExecutor>, include_tables: Vec<String>) -> Self {
        Self {
            executor,
            analyzer: SqlAnalyzer::new(),
            include_tables,
            formatter: ResultFormatter::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: ResultFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn formatter(&self) -> &ResultFormatter {
        &self.formatter
    }

    /// Parse, check and run `sql` against `database`.
    pub async fn execute(&self, sql: &str, database: &str) -> Result<QueryResult> {
        let statement = self.analyzer.parse(sql)?;
        self.analyzer
            .check_allowed(&statement, &self.include_tables)?;

        tracing::debug!(
            database,
            operation = %self.analyzer.get_operation(&statement),
            sql = %statement,
            "dispatching statement"
        );

        self.executor
            .execute(&statement, database)
            .await
            .map_err(AgentError::execution)
    }

    /// Fetch up to `limit` rows of `fields` from `table` as tab-joined lines.
    ///
    /// Sampling is advisory: any failure yields [`SAMPLE_ROWS_PLACEHOLDER`].
    pub async fn sample_rows(
        &self,
        table: &TableIdentifier,
        fields: &[String],
        limit: u32,
        database: &str,
    ) -> String {
        let projection = if fields.is_empty() {
            "*".to_string()
        } else {
            fields
                .iter()
                .map(|f| quote_ident(f))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!("SELECT {projection} FROM {} LIMIT {limit}", table.quoted());

        match self.execute(&sql, database).await {
            Ok(result) => self.formatter.render_rows(result.rows()),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "failed to sample rows");
                SAMPLE_ROWS_PLACEHOLDER.to_string()
            }
        }
    }

    /// Render a result for the agent.
    pub fn format(&self, result: &QueryResult) -> String {
        self.formatter.render_result(result)
    }
}

//! The SQL agent: the one entry point an agent-tool framework calls.
//!
//! Each operation has a `_safe` twin that never fails and instead returns
//! `Error: <message>`, since the tool loop consuming the output can only
//! read text.

use crate::cache::CacheBackend;
use crate::catalog::{CatalogCache, TableInfoMap};
use crate::error::{AgentError, Result};
use crate::executor::{QueryExecutor, SchemaIntrospector};
use crate::format::ResultFormatter;
use crate::gateway::QueryGateway;
use std::str::FromStr;
use std::sync::Arc;
use tabula_core::{AgentConfig, TableIdentifier, TenantScope};

/// How many rows of a query result to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Full rendering: column list, rows, and statistics when truncated.
    #[default]
    All,
    /// The first row only, as a single tab-joined line.
    One,
}

impl FromStr for FetchMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(FetchMode::All),
            "one" => Ok(FetchMode::One),
            other => Err(AgentError::InvalidArgument(format!(
                "Fetch parameter must be either 'one' or 'all', got '{other}'"
            ))),
        }
    }
}

pub struct SqlAgent {
    catalog: CatalogCache,
    gateway: Arc<QueryGateway>,
}

impl SqlAgent {
    /// Create an agent without a metadata cache.
    pub fn new(
        config: AgentConfig,
        executor: Arc<dyn QueryExecutor>,
        introspector: Arc<dyn SchemaIntrospector>,
    ) -> Self {
        let formatter = ResultFormatter::new(config.max_result_rows, config.max_cell_chars);
        let gateway = Arc::new(
            QueryGateway::new(executor, config.include_tables.clone()).with_formatter(formatter),
        );
        let catalog = CatalogCache::new(config, gateway.clone(), introspector);
        Self { catalog, gateway }
    }

    /// Cache catalog lookups in `backend`.
    pub fn with_cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.catalog = self.catalog.with_backend(backend);
        self
    }

    /// Qualified names of the tables the tenant may use.
    pub async fn usable_tables(&self, scope: &TenantScope) -> Result<Vec<String>> {
        self.catalog.get_usable_tables(scope).await
    }

    pub async fn usable_tables_safe(&self, scope: &TenantScope) -> String {
        match self.usable_tables(scope).await {
            Ok(tables) => tables.join(", "),
            Err(e) => e.to_tool_text(),
        }
    }

    /// Descriptions of the named tables (all usable tables when `None`),
    /// separated by blank lines.
    pub async fn table_info(
        &self,
        scope: &TenantScope,
        table_names: Option<&[String]>,
    ) -> Result<String> {
        let info = self
            .catalog
            .get_info(scope, table_names)
            .await
            .inspect_err(|e| {
                tracing::error!(tenant = %scope.company_id, error = %e, "error fetching table info")
            })?;

        let ordered: Vec<&str> = match table_names {
            Some(names) if !names.is_empty() => names
                .iter()
                .filter_map(|n| lookup_ignore_case(&info, n))
                .collect(),
            _ => info.values().map(String::as_str).collect(),
        };
        Ok(ordered.join("\n\n"))
    }

    pub async fn table_info_safe(
        &self,
        scope: &TenantScope,
        table_names: Option<&[String]>,
    ) -> String {
        self.table_info(scope, table_names)
            .await
            .unwrap_or_else(|e| e.to_tool_text())
    }

    /// Run `sql` and render the result.
    ///
    /// `fetch` is `"all"` or `"one"`; anything else fails before the query
    /// runs. With `"one"` an empty result renders as an empty string.
    pub async fn query(&self, scope: &TenantScope, sql: &str, fetch: &str) -> Result<String> {
        let mode: FetchMode = fetch.parse()?;
        let result = self.gateway.execute(sql, &scope.database).await?;

        Ok(match mode {
            FetchMode::All => self.gateway.format(&result),
            FetchMode::One => result
                .rows()
                .first()
                .map(|row| self.gateway.formatter().render_row(row))
                .unwrap_or_default(),
        })
    }

    pub async fn query_safe(&self, scope: &TenantScope, sql: &str, fetch: &str) -> String {
        self.query(scope, sql, fetch)
            .await
            .unwrap_or_else(|e| e.to_tool_text())
    }
}

/// Find a description by the simple name of a possibly qualified request.
fn lookup_ignore_case<'a>(
    info: &'a TableInfoMap,
    requested: &str,
) -> Option<&'a str> {
    let simple = TableIdentifier::parse(requested);
    info.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(simple.name()))
        .map(|(_, description)| description.as_str())
}

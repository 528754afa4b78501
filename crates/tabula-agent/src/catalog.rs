//! Table discovery and table-info caching.
//!
//! Two cache lines per [`TenantScope`]:
//!
//! | Line        | Key                                   | Value                     |
//! |-------------|---------------------------------------|---------------------------|
//! | table list  | `sha256(<tenant>_<db>_tables)`        | set of `db.table` names   |
//! | table info  | `sha256(<tenant>_<db>_table_info[_names])` | simple name → description |
//!
//! Cached values are replaced wholesale, never patched.

use crate::cache::{self, CacheBackend, CacheKey};
use crate::error::{AgentError, Result};
use crate::executor::SchemaIntrospector;
use crate::gateway::QueryGateway;
use crate::resolver::{CatalogEntry, IdentifierResolver};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tabula_core::{AgentConfig, TableIdentifier, TenantScope};

/// Never offered to the agent.
const INFORMATION_SCHEMA: &str = "information_schema";

/// Table descriptions keyed by simple table name.
pub type TableInfoMap = BTreeMap<String, String>;

pub struct CatalogCache {
    config: AgentConfig,
    gateway: Arc<QueryGateway>,
    introspector: Arc<dyn SchemaIntrospector>,
    backend: Option<Arc<dyn CacheBackend>>,
}

impl CatalogCache {
    pub fn new(
        config: AgentConfig,
        gateway: Arc<QueryGateway>,
        introspector: Arc<dyn SchemaIntrospector>,
    ) -> Self {
        Self {
            config,
            gateway,
            introspector,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Qualified names of the tables the tenant may use.
    ///
    /// A configured include-list is returned verbatim without touching the
    /// cache or the data source.
    pub async fn get_usable_tables(&self, scope: &TenantScope) -> Result<Vec<String>> {
        if self.config.has_include_list() {
            return Ok(self.config.include_tables.clone());
        }

        let key = CacheKey::tables(scope);
        if let Some(backend) = &self.backend {
            let cached: Option<Vec<String>> = cache::read(backend.as_ref(), &key).await;
            if let Some(tables) = cached.filter(|t| !t.is_empty()) {
                tracing::debug!(tenant = %scope.company_id, database = %scope.database, "table list cache hit");
                return Ok(tables);
            }
        }

        let tables = self.discover_tables(scope).await?;

        if let Some(backend) = &self.backend {
            cache::write(backend.as_ref(), &key, &tables).await;
        }
        Ok(tables)
    }

    /// Enumerate tables of the scope's database. A database whose listing
    /// fails is logged and skipped.
    async fn discover_tables(&self, scope: &TenantScope) -> Result<Vec<String>> {
        let databases = self
            .gateway
            .execute("SHOW DATABASES", &scope.database)
            .await?
            .first_column_strings();

        let ignored: Vec<TableIdentifier> = self
            .config
            .effective_ignore_tables()
            .iter()
            .map(|t| TableIdentifier::parse(t))
            .collect();

        let mut usable = BTreeSet::new();
        for db in databases {
            if db.eq_ignore_ascii_case(INFORMATION_SCHEMA)
                || db == self.config.metadata_database
                || db != scope.database
            {
                continue;
            }

            let tables = match self.gateway.execute("SHOW TABLES", &db).await {
                Ok(result) => result.first_column_strings(),
                Err(e) => {
                    let err = AgentError::Enumeration {
                        database: db.clone(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(tenant = %scope.company_id, error = %err, "skipping database");
                    continue;
                }
            };

            for table in tables {
                if table.eq_ignore_ascii_case(INFORMATION_SCHEMA) {
                    continue;
                }
                let identifier = TableIdentifier::from_parts([db.as_str(), table.as_str()]);
                if !ignored.contains(&identifier) {
                    usable.insert(identifier.to_string());
                }
            }
        }

        tracing::debug!(
            tenant = %scope.company_id,
            database = %scope.database,
            count = usable.len(),
            "discovered usable tables"
        );
        Ok(usable.into_iter().collect())
    }

    /// Descriptions of the requested tables, or of every usable table.
    ///
    /// A cached map is served only if it holds every requested table;
    /// otherwise everything is fetched again.
    pub async fn get_info(
        &self,
        scope: &TenantScope,
        table_names: Option<&[String]>,
    ) -> Result<TableInfoMap> {
        let key = CacheKey::table_info(scope, table_names);

        if let Some(backend) = &self.backend
            && let Some(hit) = self.cached_info(backend.as_ref(), &key, table_names).await
        {
            tracing::debug!(tenant = %scope.company_id, database = %scope.database, "table info cache hit");
            return Ok(hit);
        }

        let info = self.fetch_info(scope, table_names).await?;

        if let Some(backend) = &self.backend {
            cache::write(backend.as_ref(), &key, &info).await;
        }
        Ok(info)
    }

    async fn cached_info(
        &self,
        backend: &dyn CacheBackend,
        key: &CacheKey,
        table_names: Option<&[String]>,
    ) -> Option<TableInfoMap> {
        let cached: TableInfoMap = cache::read(backend, key).await?;

        let Some(names) = table_names.filter(|n| !n.is_empty()) else {
            return (!cached.is_empty()).then_some(cached);
        };

        let mut subset = TableInfoMap::new();
        for name in names {
            let simple = TableIdentifier::parse(name).name().to_string();
            let (found, description) = cached
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&simple))?;
            subset.insert(found.clone(), description.clone());
        }
        Some(subset)
    }

    async fn fetch_info(
        &self,
        scope: &TenantScope,
        table_names: Option<&[String]>,
    ) -> Result<TableInfoMap> {
        let catalog: Vec<CatalogEntry> = self
            .get_usable_tables(scope)
            .await?
            .iter()
            .map(|t| CatalogEntry::discovered(TableIdentifier::parse(t)))
            .collect();

        let tables = match table_names {
            Some(names) if !names.is_empty() => IdentifierResolver::new(&catalog).resolve(names)?,
            _ => catalog,
        };

        let mut info = TableInfoMap::new();
        for table in &tables {
            let description = self.describe_table(scope, table.identifier()).await?;
            info.insert(table.name().to_string(), description);
        }
        Ok(info)
    }

    /// Schema plus sample rows for one table.
    async fn describe_table(&self, scope: &TenantScope, table: &TableIdentifier) -> Result<String> {
        let Some(database) = table.database() else {
            return Err(AgentError::MissingDatabase(table.to_string()));
        };
        let table_name = table.name();

        let columns = self
            .introspector
            .columns(database, table_name)
            .await
            .map_err(AgentError::execution)?;
        let fields: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let sample_rows = self.config.sample_rows_in_table_info;
        let sample = self
            .gateway
            .sample_rows(table, &fields, sample_rows, &scope.database)
            .await;

        let types = columns
            .iter()
            .map(|c| format!("`{}` : `{}`", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join(",\t");

        Ok(format!(
            "Table named `{table_name}`\n\n\
             /* Sample with first {sample_rows} rows from table {table}:\n\
             {}\n{sample}\n*/\n\
             Column data types: {types}\n",
            fields.join("\t")
        ))
    }
}

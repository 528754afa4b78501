//! Postgres implementation of the Tabula executor and introspector.
//!
//! | Statement        | Runs as                                         |
//! |------------------|-------------------------------------------------|
//! | `SHOW DATABASES` | schemas from `information_schema.schemata`      |
//! | `SHOW TABLES`    | tables and views of the target schema           |
//! | anything else    | the statement, with `search_path` = target schema |

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Executor, PgPool, Row, TypeInfo};
use std::str::FromStr;
use std::time::Duration;
use tabula_agent::{ColumnDescriptor, QueryExecutor, QueryResult, SchemaIntrospector};
use tabula_core::identifier::quote_ident;
use tabula_core::{SslMode, UpstreamConfig};
use tabula_sql::Statement;

pub mod introspect;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresExecutorOptions {
    /// Run every statement in a read-only transaction.
    pub read_only: bool,
}

pub struct PostgresExecutor {
    pool: PgPool,
    options: PostgresExecutorOptions,
}

impl PostgresExecutor {
    /// Connect using the upstream configuration.
    pub async fn connect(upstream: &UpstreamConfig) -> anyhow::Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(&upstream.connection_string())?;
        if upstream.ssl_mode != SslMode::Prefer {
            connect_options = connect_options.ssl_mode(pg_ssl_mode(upstream.ssl_mode));
        }

        let pool = PgPoolOptions::new()
            .min_connections(upstream.pool.min_connections)
            .max_connections(upstream.pool.max_connections)
            .acquire_timeout(Duration::from_secs(upstream.pool.acquire_timeout_seconds))
            .connect_with(connect_options)
            .await?;

        tracing::info!(
            host = %upstream.host,
            database = %upstream.database,
            "connected to upstream Postgres"
        );
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            options: PostgresExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PostgresExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `sql` inside a transaction scoped to `schema`.
    async fn run_in_schema(&self, sql: &str, schema: &str) -> anyhow::Result<QueryResult> {
        let mut tx = self.pool.begin().await?;

        if self.options.read_only {
            (&mut *tx)
                .execute(sqlx::raw_sql("SET TRANSACTION READ ONLY"))
                .await?;
        }
        let set_path = format!("SET LOCAL search_path TO {}", quote_ident(schema));
        (&mut *tx).execute(sqlx::raw_sql(&set_path)).await?;

        let rows: Vec<PgRow> = sqlx::query(sql).fetch_all(&mut *tx).await?;

        let columns = match rows.first() {
            Some(row) => row
                .columns()
                .iter()
                .map(|c| ColumnDescriptor::new(c.name(), c.type_info().name()))
                .collect(),
            None => (&mut *tx)
                .describe(sql)
                .await?
                .columns()
                .iter()
                .map(|c| ColumnDescriptor::new(c.name(), c.type_info().name()))
                .collect(),
        };

        tx.commit().await?;

        let rows = rows.iter().map(row_values).collect();
        Ok(QueryResult::new(columns, rows))
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn execute(&self, statement: &Statement, database: &str) -> anyhow::Result<QueryResult> {
        match statement {
            Statement::ShowDatabases { .. } | Statement::ShowSchemas { .. } => {
                let schemas = introspect::list_schemas(&self.pool).await?;
                Ok(single_column("Database", schemas))
            }
            Statement::ShowTables { .. } => {
                let tables = introspect::list_tables(&self.pool, database).await?;
                Ok(single_column(&format!("Tables_in_{database}"), tables))
            }
            other => self.run_in_schema(&other.to_string(), database).await,
        }
    }
}

#[async_trait]
impl SchemaIntrospector for PostgresExecutor {
    async fn columns(&self, database: &str, table: &str) -> anyhow::Result<Vec<ColumnDescriptor>> {
        introspect::table_columns(&self.pool, database, table).await
    }
}

fn single_column(name: &str, values: Vec<String>) -> QueryResult {
    QueryResult::new(
        vec![ColumnDescriptor::new(name, "text")],
        values.into_iter().map(|v| vec![Value::String(v)]).collect(),
    )
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

/// Decode every cell of a row by probing types; NULL of any type becomes
/// `Value::Null`, undecodable types their type name in angle brackets.
fn row_values(row: &PgRow) -> Vec<Value> {
    (0..row.len()).map(|idx| cell_value(row, idx)).collect()
}

fn cell_value(row: &PgRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(idx) {
        return v.unwrap_or(Value::Null);
    }

    let type_name = row.columns()[idx].type_info().name().to_string();
    match row.try_get_raw(idx) {
        Ok(raw) if sqlx::ValueRef::is_null(&raw) => Value::Null,
        _ => Value::String(format!("<{type_name}>")),
    }
}

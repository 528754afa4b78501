//! Catalog queries against `information_schema`.
//!
//! Postgres has no cross-database queries, so Tabula's "databases" map to
//! schemas of the connected database.

use sqlx::{PgPool, Row};
use tabula_agent::ColumnDescriptor;

/// Schemas visible to the connection, excluding `pg_*` system schemas.
pub async fn list_schemas(pool: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select schema_name
        from information_schema.schemata
        where schema_name not like 'pg\_%'
        order by schema_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get("schema_name")).collect())
}

/// Base tables and views of one schema.
pub async fn list_tables(pool: &PgPool, schema: &str) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select table_name
        from information_schema.tables
        where table_schema = $1
          and table_type in ('BASE TABLE', 'VIEW')
        order by table_name
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get("table_name")).collect())
}

/// Columns of `schema.table` in ordinal order.
pub async fn table_columns(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> anyhow::Result<Vec<ColumnDescriptor>> {
    let rows = sqlx::query(
        r#"
        select column_name, data_type
        from information_schema.columns
        where table_schema = $1 and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        anyhow::bail!("table {schema}.{table} not found or has no visible columns");
    }

    Ok(rows
        .iter()
        .map(|r| ColumnDescriptor::new(r.get::<String, _>("column_name"), r.get::<String, _>("data_type")))
        .collect())
}

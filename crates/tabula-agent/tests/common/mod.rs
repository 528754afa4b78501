//! Shared fixtures for the agent integration tests.
//!
//! `MockSource` stands in for both the executor and the introspector of a
//! small `shop` database:
//!
//! | table       | rows                 |
//! |-------------|----------------------|
//! | orders      | 2 (`[1,"a"],[2,"b"]`)|
//! | customers   | 1                    |
//! | events      | 40                   |
//! | audit_log   | 0                    |
//! | broken      | sampling fails       |

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tabula_agent::{
    ColumnDescriptor, InMemoryCache, QueryExecutor, QueryResult, SchemaIntrospector, SqlAgent,
};
use tabula_core::{AgentConfig, TenantScope};
use tabula_sql::{SqlAnalyzer, Statement};

pub const DATABASE: &str = "shop";

pub fn scope() -> TenantScope {
    TenantScope::new("acme", DATABASE)
}

pub struct MockSource {
    pub databases: Vec<String>,
    pub tables: HashMap<String, Vec<String>>,
    pub failing_databases: Vec<String>,
    pub columns: HashMap<String, Vec<ColumnDescriptor>>,
    pub data: HashMap<String, QueryResult>,
    pub executed: Mutex<Vec<(String, String)>>,
    pub execute_calls: AtomicUsize,
    pub column_calls: AtomicUsize,
    analyzer: SqlAnalyzer,
}

impl MockSource {
    pub fn shop() -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            DATABASE.to_string(),
            ["orders", "customers", "events", "audit_log", "broken"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        tables.insert("warehouse".to_string(), vec!["stock".to_string()]);

        let mut columns = HashMap::new();
        columns.insert(
            "orders".to_string(),
            vec![
                ColumnDescriptor::new("id", "integer"),
                ColumnDescriptor::new("status", "text"),
            ],
        );
        columns.insert(
            "customers".to_string(),
            vec![
                ColumnDescriptor::new("id", "integer"),
                ColumnDescriptor::new("name", "text"),
            ],
        );
        columns.insert(
            "events".to_string(),
            vec![
                ColumnDescriptor::new("id", "integer"),
                ColumnDescriptor::new("kind", "text"),
            ],
        );
        columns.insert("audit_log".to_string(), vec![ColumnDescriptor::new("entry", "text")]);
        columns.insert("broken".to_string(), vec![ColumnDescriptor::new("x", "integer")]);

        let mut data = HashMap::new();
        data.insert(
            "orders".to_string(),
            result(
                &["id", "status"],
                vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
            ),
        );
        data.insert(
            "customers".to_string(),
            result(&["id", "name"], vec![vec![json!(1), json!("Ada")]]),
        );
        data.insert(
            "events".to_string(),
            result(
                &["id", "kind"],
                (1..=40)
                    .map(|i| vec![json!(i), json!(if i % 2 == 0 { "click" } else { "view" })])
                    .collect(),
            ),
        );
        data.insert("audit_log".to_string(), result(&["entry"], Vec::new()));

        Self {
            databases: vec![
                "information_schema".to_string(),
                "tabula".to_string(),
                DATABASE.to_string(),
                "warehouse".to_string(),
            ],
            tables,
            failing_databases: Vec::new(),
            columns,
            data,
            executed: Mutex::new(Vec::new()),
            execute_calls: AtomicUsize::new(0),
            column_calls: AtomicUsize::new(0),
            analyzer: SqlAnalyzer::new(),
        }
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn column_calls(&self) -> usize {
        self.column_calls.load(Ordering::SeqCst)
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }
}

pub fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::new(
        columns
            .iter()
            .map(|c| ColumnDescriptor::new(*c, ""))
            .collect(),
        rows,
    )
}

#[async_trait]
impl QueryExecutor for MockSource {
    async fn execute(&self, statement: &Statement, database: &str) -> anyhow::Result<QueryResult> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.executed
            .lock()
            .unwrap()
            .push((statement.to_string(), database.to_string()));

        match statement {
            Statement::ShowDatabases { .. } => Ok(result(
                &["Database"],
                self.databases.iter().map(|d| vec![json!(d)]).collect(),
            )),
            Statement::ShowTables { .. } => {
                if self.failing_databases.iter().any(|d| d == database) {
                    anyhow::bail!("connection to {database} refused");
                }
                let tables = self.tables.get(database).cloned().unwrap_or_default();
                Ok(result(
                    &["Tables_in_database"],
                    tables.into_iter().map(|t| vec![json!(t)]).collect(),
                ))
            }
            _ => {
                let tables = self.analyzer.extract_tables(statement);
                let Some(table) = tables.first() else {
                    return Ok(result(&["?column?"], vec![vec![json!(1)]]));
                };
                let mut data = self
                    .data
                    .get(table.name())
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("relation \"{table}\" does not exist"))?;
                if let Some(limit) = limit_of(statement) {
                    data.rows.truncate(limit);
                }
                Ok(data)
            }
        }
    }
}

#[async_trait]
impl SchemaIntrospector for MockSource {
    async fn columns(&self, _database: &str, table: &str) -> anyhow::Result<Vec<ColumnDescriptor>> {
        self.column_calls.fetch_add(1, Ordering::SeqCst);
        self.columns
            .get(table)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("table {table} has no columns"))
    }
}

fn limit_of(statement: &Statement) -> Option<usize> {
    let sql = statement.to_string();
    let (_, limit) = sql.rsplit_once(" LIMIT ")?;
    limit.trim().parse().ok()
}

pub fn agent_config() -> AgentConfig {
    AgentConfig {
        database: DATABASE.to_string(),
        ignore_tables: vec!["shop.audit_log".to_string()],
        ..Default::default()
    }
}

/// An agent over `source` with an in-memory cache.
pub fn cached_agent(source: Arc<MockSource>, config: AgentConfig) -> (SqlAgent, Arc<InMemoryCache>) {
    let cache = Arc::new(InMemoryCache::new());
    let agent = SqlAgent::new(config, source.clone(), source).with_cache(cache.clone());
    (agent, cache)
}

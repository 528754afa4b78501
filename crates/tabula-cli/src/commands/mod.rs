//! Command implementations.
//!
//! Every command loads the configuration, connects to the upstream and
//! builds an agent scoped to `--tenant` and the configured database.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tabula_adapter_pg::{PostgresExecutor, PostgresExecutorOptions};
use tabula_agent::{InMemoryCache, SqlAgent, Toolkit};
use tabula_core::{TabulaConfig, TenantScope};

pub struct Session {
    pub config_path: PathBuf,
    pub tenant: String,
    pub read_only: bool,
}

impl Session {
    async fn connect(&self) -> Result<(SqlAgent, TenantScope)> {
        let config = TabulaConfig::from_file(&self.config_path).with_context(|| {
            format!("Failed to load configuration from {:?}", self.config_path)
        })?;

        let executor = PostgresExecutor::connect(&config.upstream)
            .await
            .context("Failed to connect to upstream database")?
            .with_options(PostgresExecutorOptions {
                read_only: self.read_only,
            });
        let executor = Arc::new(executor);

        let scope = TenantScope::new(&self.tenant, &config.agent.database);
        let mut agent = SqlAgent::new(config.agent, executor.clone(), executor);
        if config.cache.enabled {
            agent = agent.with_cache(Arc::new(InMemoryCache::new()));
        }

        tracing::debug!(scope = %scope, "agent ready");
        Ok((agent, scope))
    }
}

pub async fn tables(session: &Session) -> Result<()> {
    let (agent, scope) = session.connect().await?;
    println!("{}", agent.usable_tables_safe(&scope).await);
    Ok(())
}

pub async fn info(session: &Session, tables: Vec<String>) -> Result<()> {
    let (agent, scope) = session.connect().await?;
    let names = (!tables.is_empty()).then_some(tables);
    println!("{}", agent.table_info_safe(&scope, names.as_deref()).await);
    Ok(())
}

pub async fn query(session: &Session, sql: &str, fetch: &str) -> Result<()> {
    let (agent, scope) = session.connect().await?;
    println!("{}", agent.query_safe(&scope, sql, fetch).await);
    Ok(())
}

/// Tool definitions do not depend on the database, so no connection is made.
pub fn tools() -> Result<()> {
    let definitions = tabula_agent::tools::builtin_tools();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

pub async fn call(session: &Session, tool: &str, args: &str) -> Result<()> {
    let arguments: Value =
        serde_json::from_str(args).with_context(|| format!("Invalid JSON arguments: {args}"))?;

    let (agent, scope) = session.connect().await?;
    let toolkit = Toolkit::new(Arc::new(agent), scope);
    let response = toolkit.call(tool, arguments).await;

    println!("{}", response.as_text());
    if response.is_error == Some(true) {
        anyhow::bail!("tool {tool} failed");
    }
    Ok(())
}

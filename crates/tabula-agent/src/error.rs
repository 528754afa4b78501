//! Error types for the agent crate.

use tabula_sql::SqlError;
use thiserror::Error;

/// Errors that can occur while serving an agent call.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A caller-supplied table name did not resolve against the catalog.
    #[error("Table {0} not found in database")]
    NotFound(String),

    /// A table reference lacks the database qualifier needed to describe it.
    #[error("Database is required for table: {0}")]
    MissingDatabase(String),

    /// An argument outside the accepted set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The executor or introspector failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The statement could not be parsed or was rejected before dispatch.
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// Listing one database's tables failed during discovery.
    #[error("unable to get tables for {database}: {reason}")]
    Enumeration { database: String, reason: String },

    /// The cache backend failed.
    #[error("cache error: {0}")]
    Cache(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AgentError {
    /// Wrap a failure reported by an external collaborator.
    pub fn execution(err: anyhow::Error) -> Self {
        AgentError::ExecutionFailed(format!("{err:#}"))
    }

    /// The text handed back to the agent in place of a result.
    pub fn to_tool_text(&self) -> String {
        format!("Error: {self}")
    }
}

pub type Result<T, E = AgentError> = std::result::Result<T, E>;

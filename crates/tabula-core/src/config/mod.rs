//! Configuration types for Tabula.
//!
//! Configuration is loaded from a single YAML file (`tabula.yaml`):
//!
//! ```yaml
//! upstream:
//!   database_url_env: DATABASE_URL
//! agent:
//!   database: shop
//!   ignore_tables: [shop.audit_log]
//!   sample_rows_in_table_info: 3
//! cache:
//!   enabled: true
//! ```

pub mod agent;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use agent::AgentConfig;
pub use upstream::{ConnectionPoolConfig, SslMode, UpstreamConfig};

/// Complete Tabula configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabulaConfig {
    /// Upstream database connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Catalog and query behavior exposed to the agent.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Metadata cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Metadata cache settings.
///
/// Eviction and TTL belong to the cache backend, not to this config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether catalog lookups are cached at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TabulaConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.database.trim().is_empty() {
            return Err(ConfigError::Config(
                "agent.database must not be empty".to_string(),
            ));
        }
        if self.agent.max_result_rows == 0 {
            return Err(ConfigError::Config(
                "agent.max_result_rows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! # tabula-core
//!
//! Types shared across all Tabula crates:
//!
//! - [`TenantScope`]: the tenant + target database every call runs under
//! - [`TableIdentifier`]: a quote-normalized, dotted table reference
//! - [`config`]: YAML configuration (`tabula.yaml`)

pub mod config;
pub mod identifier;
pub mod scope;

pub use config::{
    AgentConfig, CacheConfig, ConfigError, ConnectionPoolConfig, SslMode, TabulaConfig,
    UpstreamConfig,
};
pub use identifier::TableIdentifier;
pub use scope::TenantScope;

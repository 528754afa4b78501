//! # tabula-agent
//!
//! Lets an LLM tool-caller discover, describe and query tables without raw
//! SQL access.
//!
//! ## Architecture
//!
//! ```text
//! Agent tool loop
//!       │  sql_db_list_tables / sql_db_schema / sql_db_query
//!       ▼
//! ┌──────────────────────┐
//! │ SqlAgent             │  *_safe variants turn errors into text
//! │  ├─ CatalogCache     │  tenant-scoped table list + table info
//! │  │   └─ resolver     │  `Orders`, "orders", shop.orders → one entry
//! │  └─ QueryGateway     │  clean → parse → allow-list → execute → render
//! └──────────┬───────────┘
//!            ▼
//!   QueryExecutor / SchemaIntrospector / CacheBackend
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use tabula_agent::{InMemoryCache, SqlAgent};
//! use tabula_core::{TabulaConfig, TenantScope};
//!
//! let config = TabulaConfig::from_file("tabula.yaml")?;
//! let agent = SqlAgent::new(config.agent.clone(), executor.clone(), executor)
//!     .with_cache(Arc::new(InMemoryCache::new()));
//!
//! let scope = TenantScope::new("acme", &config.agent.database);
//! println!("{}", agent.table_info_safe(&scope, None).await);
//! ```

pub mod agent;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod format;
pub mod gateway;
pub mod resolver;
pub mod tools;

pub use agent::{FetchMode, SqlAgent};
pub use cache::{CacheBackend, CacheKey, InMemoryCache};
pub use catalog::{CatalogCache, TableInfoMap};
pub use error::AgentError;
pub use executor::{ColumnDescriptor, QueryExecutor, QueryResult, SchemaIntrospector};
pub use format::ResultFormatter;
pub use gateway::{QueryGateway, SAMPLE_ROWS_PLACEHOLDER};
pub use resolver::{CatalogEntry, IdentifierResolver};
pub use tools::{CallToolResponse, ToolContent, ToolDefinition, ToolRegistry, Toolkit};

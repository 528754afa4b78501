//! Tenant scoping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The tenant and target database a call runs under.
///
/// Every cache key is namespaced by this value, so two tenants querying the
/// same database never share cached catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    /// Opaque tenant identifier.
    pub company_id: String,
    /// Target database name.
    pub database: String,
}

impl TenantScope {
    /// Create a new scope.
    pub fn new(company_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            database: database.into(),
        }
    }

    /// Prefix used for cache keys derived from this scope.
    pub fn key_prefix(&self) -> String {
        format!("{}_{}", self.company_id, self.database)
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company_id, self.database)
    }
}

//! Tenant-scoped metadata cache.
//!
//! The backend is a plain key/value store ([`CacheBackend`]); eviction and
//! TTL are its business. Keys are SHA-256 digests of the tenant scope plus
//! the sorted, normalized list of requested tables, so they stay fixed-length
//! however many tables a caller asks about.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tabula_core::{TableIdentifier, TenantScope};
use tokio::sync::RwLock;

/// Key/value store holding cached catalog data.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>>;
    async fn set(&self, key: &CacheKey, value: Value) -> Result<()>;
}

/// A fixed-length, tenant-scoped cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for the usable-table list of a scope.
    pub fn tables(scope: &TenantScope) -> Self {
        Self::digest(&format!("{}_tables", scope.key_prefix()))
    }

    /// Key for table info of a scope, optionally restricted to `table_names`.
    ///
    /// Names are normalized, deduplicated and sorted first, so the key does
    /// not depend on request order or quoting.
    pub fn table_info<S: AsRef<str>>(scope: &TenantScope, table_names: Option<&[S]>) -> Self {
        let base = format!("{}_table_info", scope.key_prefix());
        match table_names {
            Some(names) if !names.is_empty() => {
                let mut normalized: Vec<String> = names
                    .iter()
                    .map(|n| TableIdentifier::parse(n.as_ref()).lookup_key().join("."))
                    .collect();
                normalized.sort();
                normalized.dedup();
                Self::digest(&format!("{base}_{}", normalized.join("_")))
            }
            _ => Self::digest(&base),
        }
    }

    fn digest(raw: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-local cache backend. Never evicts.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, Value>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &CacheKey, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.clone(), value);
        Ok(())
    }
}

/// Read a typed value, treating backend failures and undecodable entries as
/// misses.
pub(crate) async fn read<T: serde::de::DeserializeOwned>(
    backend: &dyn CacheBackend,
    key: &CacheKey,
) -> Option<T> {
    match backend.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "cache read failed");
            None
        }
    }
}

/// Store a value, logging rather than propagating backend failures.
pub(crate) async fn write<T: serde::Serialize>(backend: &dyn CacheBackend, key: &CacheKey, value: &T) {
    let result = match serde_json::to_value(value) {
        Ok(json) => backend.set(key, json).await,
        Err(e) => Err(AgentError::from(e)),
    };
    if let Err(e) = result {
        tracing::warn!(key = %key, error = %e, "cache write failed");
    }
}

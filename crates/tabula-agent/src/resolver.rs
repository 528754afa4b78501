//! Resolution of caller-supplied table names against the discovered catalog.

use crate::error::{AgentError, Result};
use std::collections::HashMap;
use tabula_core::TableIdentifier;

/// A table identifier known to exist, produced by catalog discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogEntry {
    identifier: TableIdentifier,
}

impl CatalogEntry {
    pub(crate) fn discovered(identifier: TableIdentifier) -> Self {
        Self { identifier }
    }

    pub fn identifier(&self) -> &TableIdentifier {
        &self.identifier
    }

    /// The simple (last-part) table name.
    pub fn name(&self) -> &str {
        self.identifier.name()
    }
}

impl std::fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

/// Matches raw table names against catalog entries.
///
/// A name may be given unqualified (`orders`) or fully qualified
/// (`shop.orders`), and may carry the quoting an LLM adds.
pub struct IdentifierResolver<'a> {
    index: HashMap<Vec<String>, &'a CatalogEntry>,
}

impl<'a> IdentifierResolver<'a> {
    /// Index the catalog by last part and by full part sequence. On a
    /// last-part collision the later entry wins.
    pub fn new(catalog: &'a [CatalogEntry]) -> Self {
        let mut index = HashMap::with_capacity(catalog.len() * 2);
        for entry in catalog {
            let key = entry.identifier.lookup_key();
            if let Some(last) = key.last() {
                index.insert(vec![last.clone()], entry);
            }
            index.insert(key, entry);
        }
        Self { index }
    }

    /// Resolve one raw name.
    pub fn resolve_one(&self, raw: &str) -> Result<CatalogEntry> {
        let identifier = TableIdentifier::parse(raw);
        self.index
            .get(&identifier.lookup_key())
            .map(|entry| (*entry).clone())
            .ok_or_else(|| AgentError::NotFound(identifier.to_string()))
    }

    /// Resolve every name, failing the whole batch on the first miss.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<CatalogEntry>> {
        names.iter().map(|n| self.resolve_one(n.as_ref())).collect()
    }
}

/// Resolve `names` against `catalog` in one call.
pub fn resolve<S: AsRef<str>>(names: &[S], catalog: &[CatalogEntry]) -> Result<Vec<CatalogEntry>> {
    IdentifierResolver::new(catalog).resolve(names)
}

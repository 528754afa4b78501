//! Table identifiers.
//!
//! Callers (usually an LLM) hand us table names in all sorts of shapes:
//! `orders`, `` `orders` ``, `"shop"."orders"`, `'shop.orders'` followed by a
//! newline. [`TableIdentifier::parse`] reduces all of them to the same part
//! sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Characters stripped from both ends of every part.
const TRIM_CHARS: &[char] = &[' ', '`', '"', '\'', '\n', '\r', '\t'];

const WHITESPACE: &[char] = &[' ', '\n', '\r', '\t'];

const QUOTES: &[char] = &['`', '"', '\''];

/// An ordered sequence of name parts, e.g. `[database, table]` or `[table]`.
///
/// Equality and hashing ignore ASCII case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableIdentifier {
    parts: Vec<String>,
}

impl TableIdentifier {
    /// Parse a raw, possibly quoted, dotted identifier.
    ///
    /// Dots inside a quoted part do not split it: `"my.db".orders` has two parts.
    pub fn parse(raw: &str) -> Self {
        let trimmed = unwrap_quotes(raw);

        let mut parts = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;

        for ch in trimmed.chars() {
            match (quote, ch) {
                (None, '`' | '"') => quote = Some(ch),
                (Some(q), c) if c == q => quote = None,
                (None, '.') => parts.push(std::mem::take(&mut current)),
                (_, c) => current.push(c),
            }
        }
        parts.push(current);

        Self::from_parts(parts)
    }

    /// Build an identifier from already-split parts. Parts are trimmed and
    /// empty parts dropped.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts = parts
            .into_iter()
            .map(|p| p.as_ref().trim_matches(TRIM_CHARS).to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { parts }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The simple (last-part) table name.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    /// The database qualifier, if the identifier has one.
    pub fn database(&self) -> Option<&str> {
        if self.parts.len() < 2 {
            return None;
        }
        self.parts.get(self.parts.len() - 2).map(String::as_str)
    }

    /// Lowercased part sequence used for catalog lookups.
    pub fn lookup_key(&self) -> Vec<String> {
        self.parts.iter().map(|p| p.to_ascii_lowercase()).collect()
    }

    /// Whether two identifiers name the same table, allowing either side to
    /// omit leading qualifiers: `orders` matches `shop.orders`.
    pub fn matches(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let (a, b) = (self.lookup_key(), other.lookup_key());
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        long.ends_with(&short)
    }

    /// Render the identifier with every part double-quoted, for embedding in SQL.
    pub fn quoted(&self) -> String {
        self.parts
            .iter()
            .map(|p| quote_ident(p))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Peel quotes that wrap the whole name (`` `shop.orders` ``) while leaving
/// per-part quoting (`` `shop`.`orders` ``) for the splitter.
fn unwrap_quotes(raw: &str) -> &str {
    let mut s = raw;
    loop {
        s = s.trim_matches(WHITESPACE);
        let mut chars = s.chars();
        match (chars.next(), chars.next_back()) {
            (Some(first), Some(last))
                if first == last
                    && QUOTES.contains(&first)
                    && !s[1..s.len() - 1].contains(first) =>
            {
                s = &s[1..s.len() - 1];
            }
            _ => return s,
        }
    }
}

/// Double-quote a single identifier part, escaping embedded quotes.
pub fn quote_ident(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

impl PartialEq for TableIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.lookup_key() == other.lookup_key()
    }
}

impl Eq for TableIdentifier {}

impl Hash for TableIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lookup_key().hash(state);
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

//! SQL cleaning, parsing and table analysis.

use crate::error::SqlError;
use regex::Regex;
use sqlparser::ast::{ObjectName, ObjectNamePart, Query, Statement, Visit, Visitor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::convert::Infallible;
use std::ops::ControlFlow;
use std::sync::LazyLock;
use tabula_core::TableIdentifier;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:sql)?").expect("valid code fence regex"));

/// Parses agent-supplied SQL and extracts the tables it touches.
///
/// Uses the generic dialect so that both `"quoted"` and `` `backticked` ``
/// identifiers from the caller parse.
pub struct SqlAnalyzer {
    dialect: GenericDialect,
}

impl Clone for SqlAnalyzer {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Default for SqlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlAnalyzer {
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    /// Remove markdown code fences and surrounding backticks/whitespace.
    pub fn clean_query(&self, sql: &str) -> String {
        let without_fences = CODE_FENCE.replace_all(sql, "");
        let trimmed = without_fences.trim();
        // Only a backtick pair around the whole query is markdown; a trailing
        // backtick alone closes a quoted identifier.
        match trimmed
            .strip_prefix('`')
            .and_then(|s| s.strip_suffix('`'))
        {
            Some(inner) if !inner.contains('`') => inner.trim().to_string(),
            _ => trimmed.to_string(),
        }
    }

    /// Parse a single SQL statement.
    pub fn parse(&self, sql: &str) -> Result<Statement, SqlError> {
        let cleaned = self.clean_query(sql);
        if cleaned.trim_end_matches(';').trim().is_empty() {
            return Err(SqlError::EmptyQuery);
        }

        let mut statements = Parser::parse_sql(&self.dialect, &cleaned)
            .map_err(|e| SqlError::ParseError(e.to_string()))?;

        match statements.len() {
            1 => Ok(statements.remove(0)),
            0 => Err(SqlError::EmptyQuery),
            n => Err(SqlError::MultipleStatements(n)),
        }
    }

    /// Every table referenced by a statement, in order of first appearance.
    ///
    /// A reference to a `WITH` name is not a table while that name is in
    /// scope: later CTEs and the body of the query that declares it, plus the
    /// CTE itself under `WITH RECURSIVE`.
    pub fn extract_tables(&self, stmt: &Statement) -> Vec<TableIdentifier> {
        let mut tables: Vec<TableIdentifier> = Vec::new();
        for relation in self.relations(stmt) {
            if !tables.contains(&relation.identifier) {
                tables.push(relation.identifier);
            }
        }
        tables
    }

    /// Reject the statement if it reads a table not in `include_tables`.
    ///
    /// An empty allow-list permits everything. A reference matches an entry
    /// when one is a qualifier-suffix of the other, so `orders` is accepted
    /// for an allow-list containing `shop.orders`. Unquoted parts compare
    /// case-insensitively; quoted parts must match the entry exactly, so
    /// `"ORDERS"` does not pass for `shop.orders`.
    pub fn check_allowed(&self, stmt: &Statement, include_tables: &[String]) -> Result<(), SqlError> {
        if include_tables.is_empty() {
            return Ok(());
        }

        let allowed: Vec<TableIdentifier> = include_tables
            .iter()
            .map(|t| TableIdentifier::parse(t))
            .collect();

        for relation in self.relations(stmt) {
            if !allowed.iter().any(|a| relation.matches(a)) {
                tracing::warn!(table = %relation.identifier, "query references table outside allow-list");
                return Err(SqlError::TableNotAllowed {
                    table: relation.identifier.to_string(),
                    available: include_tables.join(", "),
                });
            }
        }
        Ok(())
    }

    fn relations(&self, stmt: &Statement) -> Vec<Relation> {
        let mut collector = RelationCollector::default();
        match stmt.visit(&mut collector) {
            ControlFlow::Continue(()) => {}
            ControlFlow::Break(never) => match never {},
        }
        collector.relations
    }

    /// Get the type of SQL operation.
    pub fn get_operation(&self, stmt: &Statement) -> SqlOperation {
        match stmt {
            Statement::Query(_) => SqlOperation::Select,
            Statement::ShowDatabases { .. }
            | Statement::ShowSchemas { .. }
            | Statement::ShowTables { .. }
            | Statement::ShowColumns { .. } => SqlOperation::Show,
            Statement::Insert { .. } => SqlOperation::Insert,
            Statement::Update { .. } => SqlOperation::Update,
            Statement::Delete { .. } => SqlOperation::Delete,
            Statement::CreateTable { .. }
            | Statement::AlterTable { .. }
            | Statement::Drop { .. }
            | Statement::Truncate { .. } => SqlOperation::Ddl,
            _ => SqlOperation::Other,
        }
    }
}

/// Types of SQL operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Select,
    Show,
    Insert,
    Update,
    Delete,
    Ddl,
    Other,
}

impl std::fmt::Display for SqlOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SqlOperation::Select => "select",
            SqlOperation::Show => "show",
            SqlOperation::Insert => "insert",
            SqlOperation::Update => "update",
            SqlOperation::Delete => "delete",
            SqlOperation::Ddl => "ddl",
            SqlOperation::Other => "other",
        };
        f.write_str(s)
    }
}

/// A table reference as written in the statement.
struct Relation {
    identifier: TableIdentifier,
    /// Per part, whether it was written quoted.
    quoted: Vec<bool>,
}

impl Relation {
    fn from_object_name(name: &ObjectName) -> Self {
        let (parts, quoted): (Vec<String>, Vec<bool>) = name
            .0
            .iter()
            .map(|part| match part {
                ObjectNamePart::Identifier(ident) => {
                    (ident.value.clone(), ident.quote_style.is_some())
                }
                other => (other.to_string(), false),
            })
            .filter(|(value, _)| !value.trim().is_empty())
            .unzip();
        let identifier = TableIdentifier::from_parts(parts);
        // from_parts may drop parts; without alignment compare strictly
        let quoted = if quoted.len() == identifier.parts().len() {
            quoted
        } else {
            vec![true; identifier.parts().len()]
        };
        Self { identifier, quoted }
    }

    /// Suffix match against an allow-list entry.
    fn matches(&self, allowed: &TableIdentifier) -> bool {
        let ours = self.identifier.parts();
        let theirs = allowed.parts();
        if ours.is_empty() || theirs.is_empty() {
            return false;
        }
        let len = ours.len().min(theirs.len());
        let ours = &ours[ours.len() - len..];
        let quoted = &self.quoted[self.quoted.len() - len..];
        let theirs = &theirs[theirs.len() - len..];

        ours.iter()
            .zip(quoted)
            .zip(theirs)
            .all(|((part, &quoted), entry)| {
                if quoted {
                    part == entry
                } else {
                    part.eq_ignore_ascii_case(entry)
                }
            })
    }
}

/// CTE names declared by one query.
///
/// The visitor walks `Query::with` before the body and each `Cte::query` in
/// declaration order, so the first nested query seen while
/// `next_cte < names.len()` is the definition of CTE `next_cte`.
#[derive(Default)]
struct CteScope {
    names: Vec<String>,
    recursive: bool,
    /// Number of leading names currently visible.
    visible: usize,
    next_cte: usize,
    /// Whether this query is the definition of a CTE of the enclosing scope.
    defines_cte: bool,
}

/// Walks a statement collecting table references, skipping names bound by an
/// enclosing `WITH`.
#[derive(Default)]
struct RelationCollector {
    relations: Vec<Relation>,
    scopes: Vec<CteScope>,
}

impl RelationCollector {
    fn is_cte(&self, relation: &Relation) -> bool {
        if relation.identifier.parts().len() != 1 {
            return false;
        }
        let name = relation.identifier.name();
        self.scopes.iter().any(|scope| {
            scope.names[..scope.visible]
                .iter()
                .any(|cte| cte.eq_ignore_ascii_case(name))
        })
    }
}

impl Visitor for RelationCollector {
    type Break = Infallible;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        let mut defines_cte = false;
        if let Some(parent) = self.scopes.last_mut()
            && parent.next_cte < parent.names.len()
        {
            parent.visible = parent.next_cte + usize::from(parent.recursive);
            defines_cte = true;
        }

        let mut scope = CteScope {
            defines_cte,
            ..CteScope::default()
        };
        if let Some(with) = &query.with {
            scope.recursive = with.recursive;
            scope.names = with
                .cte_tables
                .iter()
                .map(|cte| cte.alias.name.value.clone())
                .collect();
        }
        self.scopes.push(scope);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        if let Some(scope) = self.scopes.pop()
            && scope.defines_cte
            && let Some(parent) = self.scopes.last_mut()
        {
            parent.next_cte += 1;
            parent.visible = parent.next_cte;
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, name: &ObjectName) -> ControlFlow<Self::Break> {
        let relation = Relation::from_object_name(name);
        if !relation.identifier.is_empty() && !self.is_cte(&relation) {
            self.relations.push(relation);
        }
        ControlFlow::Continue(())
    }
}

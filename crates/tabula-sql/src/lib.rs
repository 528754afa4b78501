//! # tabula-sql
//!
//! SQL handling in front of the executor:
//!
//! - Strip the markdown an LLM tends to wrap around a query
//! - Parse it with `sqlparser` (exactly one statement)
//! - Collect every table the statement reads from, including joins,
//!   subqueries and CTE bodies
//! - Reject statements touching tables outside the allow-list
//!
//! ```text
//! "```sql\nSELECT * FROM orders\n```"
//!        │ clean_query
//!        ▼
//! "SELECT * FROM orders"
//!        │ parse + check_allowed(["shop.orders"])
//!        ▼
//!   Statement  ──► executor
//! ```

pub mod error;
pub mod parser;

pub use error::SqlError;
pub use parser::{SqlAnalyzer, SqlOperation};

pub use sqlparser::ast::Statement;

//! Agent tools wrapping [`SqlAgent`].
//!
//! | Tool                 | Input                          | Output                      |
//! |----------------------|--------------------------------|-----------------------------|
//! | `sql_db_list_tables` | -                              | comma-separated table names |
//! | `sql_db_schema`      | `tables`: comma-separated names | table descriptions          |
//! | `sql_db_query`       | `query`, optional `fetch`      | rendered result             |
//!
//! Tool output is always text. Failures come back as an `Error: ...` text
//! with `isError` set, never as a transport-level error.

use crate::agent::SqlAgent;
use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tabula_core::TenantScope;

pub const LIST_TABLES_TOOL: &str = "sql_db_list_tables";
pub const SCHEMA_TOOL: &str = "sql_db_schema";
pub const QUERY_TOOL: &str = "sql_db_query";

/// Tool definition as advertised to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool response content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

/// Call tool response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResponse {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    pub fn error(err: &AgentError) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: err.to_tool_text(),
            }],
            is_error: Some(true),
        }
    }

    /// Concatenated text content.
    pub fn as_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Registry of available tools, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.tools.values().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct SchemaArgs {
    #[serde(default)]
    tables: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
    #[serde(default = "default_fetch")]
    fetch: String,
}

fn default_fetch() -> String {
    "all".to_string()
}

/// The three SQL tools bound to one agent and tenant scope.
pub struct Toolkit {
    agent: Arc<SqlAgent>,
    scope: TenantScope,
    registry: ToolRegistry,
}

impl Toolkit {
    pub fn new(agent: Arc<SqlAgent>, scope: TenantScope) -> Self {
        let mut registry = ToolRegistry::new();
        for tool in builtin_tools() {
            registry.register(tool);
        }
        Self {
            agent,
            scope,
            registry,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.registry.list()
    }

    /// Invoke a tool by name.
    pub async fn call(&self, name: &str, arguments: Value) -> CallToolResponse {
        tracing::debug!(tool = name, tenant = %self.scope.company_id, "tool call");

        let outcome = match name {
            LIST_TABLES_TOOL => self
                .agent
                .usable_tables(&self.scope)
                .await
                .map(|tables| tables.join(", ")),
            SCHEMA_TOOL => match parse_args::<SchemaArgs>(name, arguments) {
                Ok(args) => {
                    let names = split_table_list(args.tables.as_deref());
                    let names = (!names.is_empty()).then_some(names);
                    self.agent.table_info(&self.scope, names.as_deref()).await
                }
                Err(e) => Err(e),
            },
            QUERY_TOOL => match parse_args::<QueryArgs>(name, arguments) {
                Ok(args) => {
                    self.agent
                        .query(&self.scope, &args.query, &args.fetch)
                        .await
                }
                Err(e) => Err(e),
            },
            other => Err(AgentError::InvalidArgument(format!("unknown tool: {other}"))),
        };

        match outcome {
            Ok(text) => CallToolResponse::text(text),
            Err(e) => CallToolResponse::error(&e),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, AgentError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments)
        .map_err(|e| AgentError::InvalidArgument(format!("invalid arguments for tool {tool}: {e}")))
}

/// Split `"orders, shop.customers"` into names, dropping empties.
fn split_table_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Definitions of the three SQL tools.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: LIST_TABLES_TOOL.to_string(),
            description: Some(
                "Input is an empty string, output is a comma-separated list of tables in the database."
                    .to_string(),
            ),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: SCHEMA_TOOL.to_string(),
            description: Some(format!(
                "Input is a comma-separated list of tables, output is the schema and sample rows \
                 for those tables. Be sure the tables exist by calling {LIST_TABLES_TOOL} first."
            )),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tables": {
                        "type": "string",
                        "description": "Comma-separated table names, e.g. `orders, shop.customers`"
                    }
                },
                "required": ["tables"]
            }),
        },
        ToolDefinition {
            name: QUERY_TOOL.to_string(),
            description: Some(format!(
                "Input is a detailed and correct SQL query, output is a result from the database. \
                 If the query is not correct, an error message is returned. If an error is returned, \
                 rewrite the query, check it, and try again. Use {SCHEMA_TOOL} to look up column names."
            )),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "fetch": { "type": "string", "enum": ["all", "one"], "default": "all" }
                },
                "required": ["query"]
            }),
        },
    ]
}

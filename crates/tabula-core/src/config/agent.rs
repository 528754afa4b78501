//! Agent-facing catalog and query settings.

use serde::{Deserialize, Serialize};

/// What the agent is allowed to see and how results are bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Target database whose tables are discovered.
    #[serde(default = "default_database")]
    pub database: String,

    /// Explicit allow-list of qualified table names. When non-empty, it is
    /// authoritative: discovery is skipped and queries touching other tables
    /// are rejected.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Qualified table names removed from discovered tables. Ignored when
    /// `include_tables` is set.
    #[serde(default)]
    pub ignore_tables: Vec<String>,

    /// Number of sample rows appended to each table description.
    #[serde(default = "default_sample_rows")]
    pub sample_rows_in_table_info: u32,

    /// The system's own metadata database, never offered to the agent.
    #[serde(default = "default_metadata_database")]
    pub metadata_database: String,

    /// Maximum number of data rows rendered for a query result.
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,

    /// Rendered cell values longer than this are cut and suffixed with `...`.
    #[serde(default = "default_max_cell_chars")]
    pub max_cell_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            include_tables: Vec::new(),
            ignore_tables: Vec::new(),
            sample_rows_in_table_info: default_sample_rows(),
            metadata_database: default_metadata_database(),
            max_result_rows: default_max_result_rows(),
            max_cell_chars: default_max_cell_chars(),
        }
    }
}

impl AgentConfig {
    /// Whether an allow-list is configured.
    pub fn has_include_list(&self) -> bool {
        !self.include_tables.is_empty()
    }

    /// The exclude-list actually in force. Empty when an include-list is set,
    /// since the two are mutually exclusive and the include-list wins.
    pub fn effective_ignore_tables(&self) -> &[String] {
        if self.has_include_list() {
            &[]
        } else {
            self.ignore_tables.as_slice()
        }
    }
}

fn default_database() -> String {
    "public".to_string()
}

fn default_sample_rows() -> u32 {
    3
}

fn default_metadata_database() -> String {
    "tabula".to_string()
}

fn default_max_result_rows() -> usize {
    30
}

fn default_max_cell_chars() -> usize {
    100
}

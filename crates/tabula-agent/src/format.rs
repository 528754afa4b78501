//! Rendering of query results into bounded, LLM-readable text.
//!
//! Every renderer goes through [`ResultFormatter::render_value`], so a cell
//! longer than `max_cell_chars` is cut the same way in query output, sample
//! rows and statistics.

use crate::executor::QueryResult;
use serde_json::Value;
use std::collections::HashMap;

/// Rows shown before a result is summarized.
pub const DEFAULT_MAX_ROWS: usize = 30;

/// Cell width before truncation.
pub const DEFAULT_MAX_CELL_CHARS: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct ResultFormatter {
    max_rows: usize,
    max_cell_chars: usize,
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROWS, DEFAULT_MAX_CELL_CHARS)
    }
}

impl ResultFormatter {
    pub fn new(max_rows: usize, max_cell_chars: usize) -> Self {
        Self {
            max_rows: max_rows.max(1),
            max_cell_chars,
        }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Render one cell.
    pub fn render_value(&self, value: &Value) -> String {
        let text = match value {
            Value::Null => "None".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.truncate(text)
    }

    fn truncate(&self, text: String) -> String {
        if text.chars().count() <= self.max_cell_chars {
            return text;
        }
        let cut: String = text.chars().take(self.max_cell_chars).collect();
        format!("{cut}...")
    }

    /// One row as a tab-joined line.
    pub fn render_row(&self, row: &[Value]) -> String {
        row.iter()
            .map(|v| self.render_value(v))
            .collect::<Vec<_>>()
            .join("\t")
    }

    /// Rows as tab-joined lines separated by newlines.
    pub fn render_rows(&self, rows: &[Vec<Value>]) -> String {
        rows.iter()
            .map(|row| self.render_row(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render a full result: column list, then at most `max_rows` rows.
    /// Longer results get a statistics block ahead of the truncated rows.
    pub fn render_result(&self, result: &QueryResult) -> String {
        let columns = result
            .columns
            .iter()
            .map(|c| format!("'{}'", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = format!("Output columns: {columns}\n");

        let rows = result.rows();
        if rows.len() > self.max_rows {
            out.push_str(&format!(
                "Result has {} rows. Description of data:\n",
                rows.len()
            ));
            out.push_str(&self.describe(result));
            out.push_str("\n\n");
            out.push_str(&format!("First {} rows:\n", self.max_rows));
        } else {
            out.push_str("Result:\n");
        }

        out.push_str(&self.render_rows(&rows[..rows.len().min(self.max_rows)]));
        out
    }

    /// Descriptive statistics per column, laid out as a tab-separated table
    /// with one line per statistic.
    ///
    /// Numeric columns get count/mean/std/min/quartiles/max; other columns get
    /// count/unique/top/freq. Statistics not applicable to a column show `NaN`.
    pub fn describe(&self, result: &QueryResult) -> String {
        let stats: Vec<ColumnStats> = (0..result.columns.len())
            .map(|idx| ColumnStats::compute(result.rows().iter().filter_map(|row| row.get(idx))))
            .collect();

        let any_numeric = stats.iter().any(|s| matches!(s, ColumnStats::Numeric { .. }));
        let any_categorical = stats
            .iter()
            .any(|s| matches!(s, ColumnStats::Categorical { .. }));

        let mut labels = vec!["count"];
        if any_categorical {
            labels.extend(["unique", "top", "freq"]);
        }
        if any_numeric {
            labels.extend(["mean", "std", "min", "25%", "50%", "75%", "max"]);
        }

        let mut lines = Vec::with_capacity(labels.len() + 1);
        let header: Vec<String> = result.columns.iter().map(|c| self.truncate(c.name.clone())).collect();
        lines.push(format!("\t{}", header.join("\t")));

        for label in labels {
            let cells: Vec<String> = stats.iter().map(|s| self.stat_cell(s, label)).collect();
            lines.push(format!("{label}\t{}", cells.join("\t")));
        }
        lines.join("\n")
    }

    fn stat_cell(&self, stats: &ColumnStats, label: &str) -> String {
        const NAN: &str = "NaN";
        match stats {
            ColumnStats::Numeric { count, sorted, mean, std } => match label {
                "count" => count.to_string(),
                "mean" => format_number(*mean),
                "std" => std.map(format_number).unwrap_or_else(|| NAN.to_string()),
                "min" => format_number(sorted[0]),
                "25%" => format_number(quantile(sorted, 0.25)),
                "50%" => format_number(quantile(sorted, 0.5)),
                "75%" => format_number(quantile(sorted, 0.75)),
                "max" => format_number(sorted[sorted.len() - 1]),
                _ => NAN.to_string(),
            },
            ColumnStats::Categorical { count, unique, top, freq } => match label {
                "count" => count.to_string(),
                "unique" => unique.to_string(),
                "top" => top
                    .as_ref()
                    .map(|v| self.render_value(v))
                    .unwrap_or_else(|| NAN.to_string()),
                "freq" => freq.to_string(),
                _ => NAN.to_string(),
            },
        }
    }
}

/// Per-column summary. A column is numeric when every non-null value is a
/// number and there is at least one.
enum ColumnStats {
    Numeric {
        count: usize,
        sorted: Vec<f64>,
        mean: f64,
        std: Option<f64>,
    },
    Categorical {
        count: usize,
        unique: usize,
        top: Option<Value>,
        freq: usize,
    },
}

impl ColumnStats {
    fn compute<'a>(values: impl Iterator<Item = &'a Value>) -> Self {
        let present: Vec<&Value> = values.filter(|v| !v.is_null()).collect();

        let numbers: Option<Vec<f64>> = present.iter().map(|v| v.as_f64()).collect();
        if let Some(mut sorted) = numbers.filter(|n| !n.is_empty()) {
            sorted.sort_by(|a, b| a.total_cmp(b));
            let n = sorted.len() as f64;
            let mean = sorted.iter().sum::<f64>() / n;
            let std = (sorted.len() > 1).then(|| {
                let var = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
                var.sqrt()
            });
            return ColumnStats::Numeric {
                count: sorted.len(),
                sorted,
                mean,
                std,
            };
        }

        // Counts keyed by the JSON text; first-seen order breaks ties.
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for (position, value) in present.iter().enumerate() {
            let entry = counts.entry(value.to_string()).or_insert((0, position));
            entry.0 += 1;
        }
        let best = counts
            .values()
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .copied();

        ColumnStats::Categorical {
            count: present.len(),
            unique: counts.len(),
            top: best.map(|(_, position)| present[position].clone()),
            freq: best.map(|(freq, _)| freq).unwrap_or(0),
        }
    }
}

/// Linear-interpolated quantile of a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

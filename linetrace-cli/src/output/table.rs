//! Table output formatting using the `tabled` crate
//!
//! One row per document, one column per top-level field. Columns appear in
//! the order fields are first seen across the documents, so projected result
//! sets keep the field order the server returned.

use super::{extjson_scalar, truncate, OutputConfig};
use serde_json::Value;
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Modify, Width},
};

/// Widest a nested value may render before truncation on a TTY
const MAX_NESTED_WIDTH: usize = 60;

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Format a list of JSON documents as a table.
    pub fn format_documents(docs: &[Value], config: &OutputConfig) -> String {
        let columns = Self::columns(docs);
        if columns.is_empty() {
            return String::new();
        }

        let mut builder = Builder::default();
        builder.push_record(columns.iter().map(String::as_str));

        for doc in docs {
            let row: Vec<String> = columns
                .iter()
                .map(|key| match doc.get(key) {
                    Some(value) => Self::cell(value, config),
                    None => "-".to_string(),
                })
                .collect();
            builder.push_record(row);
        }

        let mut table = builder.build();
        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }

        if config.should_truncate() {
            let term_width = config.effective_width();
            let per_column = (term_width.saturating_sub(columns.len() * 3)) / columns.len();
            if per_column > 0 {
                for i in 0..columns.len() {
                    table.with(Modify::new(Columns::single(i)).with(Width::truncate(per_column)));
                }
            }
            table.with(Width::wrap(term_width));
        }

        table.to_string()
    }

    /// Union of top-level keys in first-seen order.
    fn columns(docs: &[Value]) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for key in docs.iter().filter_map(Value::as_object).flat_map(|o| o.keys()) {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        columns
    }

    fn cell(value: &Value, config: &OutputConfig) -> String {
        let s = Self::value_to_string(value);
        if config.should_truncate() && matches!(value, Value::Array(_) | Value::Object(_)) {
            truncate(&s, MAX_NESTED_WIDTH)
        } else {
            s
        }
    }

    /// Convert a JSON value to a display string
    fn value_to_string(value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Object(obj) => {
                extjson_scalar(obj).unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default())
            }
            Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        }
    }
}

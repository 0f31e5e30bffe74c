//! Tree output formatting for nested documents.
//!
//! Provides tree-style formatting similar to the `tree` command,
//! with Unicode box-drawing characters for visual hierarchy.

use super::{extjson_scalar, OutputConfig};
use colored::Colorize;
use serde_json::{Map, Value};

/// Tree output formatter
pub struct TreeOutput;

/// Tree branch characters
struct TreeChars {
    pipe: &'static str,
    branch: &'static str,
    last: &'static str,
    space: &'static str,
}

const CHARS: TreeChars = TreeChars {
    pipe: "\u{2502}   ",                 // |
    branch: "\u{251c}\u{2500}\u{2500} ", // |--
    last: "\u{2514}\u{2500}\u{2500} ",   // L--
    space: "    ",
};

impl TreeOutput {
    /// Format each document as its own tree, headed by its `_id`.
    pub fn format_documents(docs: &[Value], config: &OutputConfig) -> String {
        docs.iter()
            .enumerate()
            .map(|(i, doc)| {
                let title = match doc.get("_id") {
                    Some(id) => format!("[{}] {}", i, Self::scalar(id)),
                    None => format!("[{}]", i),
                };
                let title = if config.use_colors() {
                    title.bold().to_string()
                } else {
                    title
                };
                match doc {
                    Value::Object(obj) if !obj.is_empty() => {
                        format!("{}\n{}", title, Self::format_object(obj, config, ""))
                    }
                    other => format!("{} {}", title, Self::format_leaf(other, config)),
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn scalar(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Object(obj) => extjson_scalar(obj).unwrap_or_else(|| value.to_string()),
            other => other.to_string(),
        }
    }

    /// Render a leaf value, collapsing Extended JSON wrappers.
    fn format_leaf(value: &Value, config: &OutputConfig) -> String {
        let use_colors = config.use_colors();
        match value {
            Value::String(s) if use_colors => s.yellow().to_string(),
            Value::Number(n) if use_colors => n.to_string().cyan().to_string(),
            Value::Bool(true) if use_colors => "true".green().to_string(),
            Value::Bool(false) if use_colors => "false".red().to_string(),
            Value::Null if use_colors => "null".dimmed().to_string(),
            Value::Object(obj) => match extjson_scalar(obj) {
                Some(s) if use_colors => s.yellow().to_string(),
                Some(s) => s,
                None => value.to_string(),
            },
            other => Self::scalar(other),
        }
    }

    /// True for values rendered on a single line.
    fn is_leaf(value: &Value) -> bool {
        match value {
            Value::Object(obj) => obj.is_empty() || extjson_scalar(obj).is_some(),
            Value::Array(arr) => arr.is_empty(),
            _ => true,
        }
    }

    /// Format a JSON object as tree
    fn format_object(obj: &Map<String, Value>, config: &OutputConfig, prefix: &str) -> String {
        let use_colors = config.use_colors();
        let len = obj.len();
        let mut lines = Vec::new();

        for (i, (key, value)) in obj.iter().enumerate() {
            let is_last_item = i == len - 1;
            let connector = if is_last_item { CHARS.last } else { CHARS.branch };
            let child_prefix = format!(
                "{}{}",
                prefix,
                if is_last_item { CHARS.space } else { CHARS.pipe }
            );
            let key_str = if use_colors {
                key.bold().to_string()
            } else {
                key.clone()
            };

            lines.push(Self::format_entry(
                &format!("{}{}{}", prefix, connector, key_str),
                value,
                config,
                &child_prefix,
            ));
        }

        lines.join("\n")
    }

    /// Format a JSON array as tree
    fn format_array(arr: &[Value], config: &OutputConfig, prefix: &str) -> String {
        let use_colors = config.use_colors();
        let len = arr.len();
        let mut lines = Vec::new();

        for (i, item) in arr.iter().enumerate() {
            let is_last_item = i == len - 1;
            let connector = if is_last_item { CHARS.last } else { CHARS.branch };
            let child_prefix = format!(
                "{}{}",
                prefix,
                if is_last_item { CHARS.space } else { CHARS.pipe }
            );
            let index_str = if use_colors {
                format!("[{}]", i).dimmed().to_string()
            } else {
                format!("[{}]", i)
            };

            lines.push(Self::format_entry(
                &format!("{}{}{}", prefix, connector, index_str),
                item,
                config,
                &child_prefix,
            ));
        }

        lines.join("\n")
    }

    fn format_entry(head: &str, value: &Value, config: &OutputConfig, child_prefix: &str) -> String {
        if Self::is_leaf(value) {
            return format!("{}: {}", head, Self::format_leaf(value, config));
        }
        match value {
            Value::Object(nested) => {
                format!("{}\n{}", head, Self::format_object(nested, config, child_prefix))
            }
            Value::Array(arr) => {
                let count = format!("[{}]", arr.len());
                let count = if config.use_colors() {
                    count.dimmed().to_string()
                } else {
                    count
                };
                format!(
                    "{} {}\n{}",
                    head,
                    count,
                    Self::format_array(arr, config, child_prefix)
                )
            }
            _ => format!("{}: {}", head, Self::format_leaf(value, config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use serde_json::json;

    fn plain() -> OutputConfig {
        OutputConfig::new(OutputFormat::Tree).without_colors()
    }

    #[test]
    fn test_format_plan_document() {
        let docs = vec![json!({
            "_id": { "$oid": "584533a47d89971ad460daa1" },
            "aim_count": 1200,
            "line": {
                "id": "584533d07d89971ad460daa2",
                "process": { "id": "584533d07d89971ad460daa4", "machine": { "name": "machine_one" } }
            }
        })];
        let output = TreeOutput::format_documents(&docs, &plain());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "[0] 584533a47d89971ad460daa1");
        assert_eq!(lines[1], "\u{251c}\u{2500}\u{2500} _id: 584533a47d89971ad460daa1");
        assert_eq!(lines[2], "\u{251c}\u{2500}\u{2500} aim_count: 1200");
        assert_eq!(lines[3], "\u{2514}\u{2500}\u{2500} line");
        assert!(output.contains("name: machine_one"));
    }

    #[test]
    fn test_format_arrays() {
        let docs = vec![json!({ "machine": [{ "name": "a" }, { "name": "b" }], "tags": [] })];
        let output = TreeOutput::format_documents(&docs, &plain());

        assert!(output.contains("machine [2]"));
        assert!(output.contains("[1]"));
        assert!(output.contains("tags: []"));
    }

    #[test]
    fn test_documents_are_separated() {
        let docs = vec![json!({ "_id": 1 }), json!({ "_id": 2 })];
        let output = TreeOutput::format_documents(&docs, &plain());
        assert!(output.contains("[0] 1"));
        assert!(output.contains("\n\n[1] 2"));
    }
}

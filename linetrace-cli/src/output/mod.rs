//! Output formatting module for the linetrace CLI
//!
//! Renders lookup results in one of three formats: table (human-readable
//! summary, one row per document), json (the documents as relaxed Extended
//! JSON) and tree (full nested structure).
//!
//! Automatically detects TTY context to adjust colors and truncation behavior.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;

mod json;
mod table;
mod tree;

pub use self::json::JsonOutput;
pub use self::table::TableOutput;
pub use self::tree::TreeOutput;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
    /// Tree format for nested documents
    Tree,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "tree" => Ok(OutputFormat::Tree),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// The output format to use
    pub format: OutputFormat,
    /// Disable colored output
    pub no_color: bool,
    /// Disable truncation of long values
    pub no_truncate: bool,
    /// Override terminal width (None = auto-detect)
    pub width: Option<usize>,
    /// Compact mode (less whitespace)
    pub compact: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with the specified format
    #[cfg(test)]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_color: false,
            no_truncate: false,
            width: None,
            compact: false,
        }
    }

    /// Create an OutputConfig with automatic TTY detection and optional color override.
    ///
    /// When output is not a TTY (piped or redirected) truncation is disabled,
    /// and so are colors unless `color_override` is `Some(true)`.
    /// `Some(false)` forces colors off; `None` follows the TTY.
    pub fn auto_detect_with_color_override(
        format: OutputFormat,
        color_override: Option<bool>,
    ) -> Self {
        Self::detect(format, color_override, std::io::stdout().is_terminal())
    }

    fn detect(format: OutputFormat, color_override: Option<bool>, is_tty: bool) -> Self {
        Self {
            format,
            no_color: !color_override.unwrap_or(is_tty),
            no_truncate: !is_tty,
            width: None,
            compact: false,
        }
    }

    /// Get the effective terminal width
    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or_else(|| {
            terminal_size::terminal_size()
                .map(|(w, _)| w.0 as usize)
                .unwrap_or(80)
        })
    }

    pub fn use_colors(&self) -> bool {
        !self.no_color
    }

    pub fn should_truncate(&self) -> bool {
        !self.no_truncate
    }

    /// Builder: disable colors
    #[cfg(test)]
    pub fn without_colors(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// Builder: disable truncation
    #[cfg(test)]
    pub fn without_truncation(mut self) -> Self {
        self.no_truncate = true;
        self
    }

    /// Builder: set width
    #[cfg(test)]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Builder: enable compact mode
    #[cfg(test)]
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

/// Trait for types that can be formatted as output
pub trait Outputter: Serialize {
    /// Render as table format
    fn to_table(&self, config: &OutputConfig) -> String;

    /// Render as JSON format
    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(self, config)
    }

    /// Render as tree format
    fn to_tree(&self, config: &OutputConfig) -> String {
        // Default implementation falls back to table
        self.to_table(config)
    }

    /// Render using the format specified in config
    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Table => self.to_table(config),
            OutputFormat::Json => self.to_json(config),
            OutputFormat::Tree => self.to_tree(config),
        }
    }
}

/// Result wrapper for formatted output with automatic format selection
pub struct Output<T> {
    data: T,
    config: OutputConfig,
}

impl<T: Outputter> Output<T> {
    /// Create a new output wrapper with full config
    pub fn with_config(data: T, config: OutputConfig) -> Self {
        Self { data, config }
    }

    /// Render the output to stdout
    pub fn render(&self) -> anyhow::Result<()> {
        println!("{}", self.data.render(&self.config));
        Ok(())
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Truncate a string to a maximum width with ellipsis
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let truncated: String = s.chars().take(max_width - 3).collect();
        format!("{}...", truncated)
    }
}

/// Unwrap single-key Extended JSON wrappers such as `{"$oid": "..."}` or
/// `{"$date": "..."}` to their inner value for display.
pub fn extjson_scalar(obj: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    if obj.len() != 1 {
        return None;
    }
    let (key, value) = obj.iter().next()?;
    if !key.starts_with('$') {
        return None;
    }
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("tree".parse::<OutputFormat>(), Ok(OutputFormat::Tree));
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_config_builder() {
        let config = OutputConfig::new(OutputFormat::Json)
            .without_colors()
            .without_truncation()
            .with_width(120)
            .compact();

        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.use_colors());
        assert!(!config.should_truncate());
        assert_eq!(config.effective_width(), 120);
        assert!(config.compact);
    }

    #[test]
    fn test_color_override_beats_tty_detection() {
        let piped = OutputConfig::detect(OutputFormat::Table, Some(true), false);
        assert!(piped.use_colors());
        assert!(!piped.should_truncate());

        let tty = OutputConfig::detect(OutputFormat::Table, Some(false), true);
        assert!(!tty.use_colors());
        assert!(tty.should_truncate());

        assert!(OutputConfig::detect(OutputFormat::Table, None, true).use_colors());
        assert!(!OutputConfig::detect(OutputFormat::Table, None, false).use_colors());
    }

    #[test]
    fn test_extjson_scalar() {
        let oid = serde_json::json!({ "$oid": "584533a47d89971ad460daa1" });
        assert_eq!(
            extjson_scalar(oid.as_object().unwrap()),
            Some("584533a47d89971ad460daa1".to_string())
        );

        let plain = serde_json::json!({ "name": "machine_one" });
        assert_eq!(extjson_scalar(plain.as_object().unwrap()), None);
    }
}

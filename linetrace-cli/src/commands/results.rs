//! Result types shared by the lookup commands.

use bson::{Bson, Document};
use colored::Colorize;
use linetrace_core::Pipeline;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::output::{OutputConfig, Outputter, TableOutput, TreeOutput};

/// Documents returned by a lookup.
///
/// Serializes as a bare JSON array of relaxed Extended JSON documents.
#[derive(Debug)]
pub struct DocumentSet {
    pub collection: String,
    pub documents: Vec<Value>,
    pub execution_time_ms: u64,
}

impl DocumentSet {
    pub fn new(collection: impl Into<String>, docs: Vec<Document>, execution_time_ms: u64) -> Self {
        Self {
            collection: collection.into(),
            documents: docs
                .into_iter()
                .map(|d| Bson::Document(d).into_relaxed_extjson())
                .collect(),
            execution_time_ms,
        }
    }
}

impl Serialize for DocumentSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.documents.serialize(serializer)
    }
}

impl Outputter for DocumentSet {
    fn to_table(&self, config: &OutputConfig) -> String {
        if self.documents.is_empty() {
            return Self::empty(config);
        }
        format!(
            "{}\n{}",
            TableOutput::format_documents(&self.documents, config),
            self.footer(config)
        )
    }

    fn to_tree(&self, config: &OutputConfig) -> String {
        if self.documents.is_empty() {
            return Self::empty(config);
        }
        format!(
            "{}\n\n{}",
            TreeOutput::format_documents(&self.documents, config),
            self.footer(config)
        )
    }
}

impl DocumentSet {
    fn empty(config: &OutputConfig) -> String {
        let message = "No documents matched.";
        if config.use_colors() {
            message.dimmed().to_string()
        } else {
            message.to_string()
        }
    }

    fn footer(&self, config: &OutputConfig) -> String {
        let count = self.documents.len();
        if !config.use_colors() {
            return format!(
                "{} document(s) from {} in {}ms",
                count, self.collection, self.execution_time_ms
            );
        }
        format!(
            "{} document(s) from {} in {}ms",
            count.to_string().cyan(),
            self.collection.cyan(),
            self.execution_time_ms.to_string().yellow()
        )
    }
}

/// The pipeline a lookup would submit, shown by `--explain`.
#[derive(Debug, Serialize)]
pub struct PipelineView {
    pub collection: String,
    pub pipeline: Vec<Value>,
}

impl PipelineView {
    pub fn new(collection: impl Into<String>, pipeline: &Pipeline) -> Self {
        Self {
            collection: collection.into(),
            pipeline: pipeline
                .to_documents()
                .into_iter()
                .map(|d| Bson::Document(d).into_relaxed_extjson())
                .collect(),
        }
    }
}

impl Outputter for PipelineView {
    /// Render in console form, one stage per line.
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = format!("db.{}.aggregate([\n", self.collection);
        let len = self.pipeline.len();
        for (i, stage) in self.pipeline.iter().enumerate() {
            let sep = if i + 1 == len { "" } else { "," };
            output.push_str(&format!("    {}{}\n", stage, sep));
        }
        output.push_str("])");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use bson::{doc, oid::ObjectId};
    use linetrace_core::ProductionProcessQuery;

    fn plain(format: OutputFormat) -> OutputConfig {
        OutputConfig::new(format).without_colors().without_truncation()
    }

    #[test]
    fn test_document_set_json_is_bare_array() {
        let oid = ObjectId::parse_str("5840e6ac61016e2814fee5a0").unwrap();
        let set = DocumentSet::new("production", vec![doc! { "_id": oid, "n": 1 }], 3);
        let json = set.render(&plain(OutputFormat::Json).compact());
        assert_eq!(json, r#"[{"_id":{"$oid":"5840e6ac61016e2814fee5a0"},"n":1}]"#);
    }

    #[test]
    fn test_empty_document_set() {
        let set = DocumentSet::new("plan", Vec::new(), 0);
        assert_eq!(set.render(&plain(OutputFormat::Table)), "No documents matched.");
        assert_eq!(set.render(&plain(OutputFormat::Json).compact()), "[]");
    }

    #[test]
    fn test_configured_color_applies_when_piped() {
        colored::control::set_override(true);
        let forced = OutputConfig::auto_detect_with_color_override(OutputFormat::Table, Some(true));
        let set = DocumentSet::new("plan", Vec::new(), 0);
        assert!(set.render(&forced).contains("\u{1b}["));

        let off = OutputConfig::auto_detect_with_color_override(OutputFormat::Table, Some(false));
        assert_eq!(set.render(&off), "No documents matched.");
    }

    #[test]
    fn test_document_set_table_footer() {
        let set = DocumentSet::new("plan", vec![doc! { "_id": 1, "aim_count": 1200 }], 7);
        let text = set.render(&plain(OutputFormat::Table));
        assert!(text.contains("aim_count"));
        assert!(text.ends_with("1 document(s) from plan in 7ms"));
    }

    #[test]
    fn test_pipeline_view_console_form() {
        let query = ProductionProcessQuery::new("5840e6ac61016e2814fee5a2").unwrap();
        let view = PipelineView::new("production", &query.pipeline(&linetrace_core::Page::all()));
        let text = view.render(&plain(OutputFormat::Table));

        assert!(text.starts_with("db.production.aggregate([\n"));
        assert!(text.contains(r#"{"$unwind":"$process_embed"},"#));
        assert!(text.contains(r#"{"$match":{"process_embed._id":{"$oid":"5840e6ac61016e2814fee5a2"}}}"#));
        assert!(text.ends_with("])"));
    }
}

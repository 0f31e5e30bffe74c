//! In-memory document store.

use std::collections::HashMap;

use bson::Document;

use super::DocumentStore;
use crate::error::Result;
use crate::pipeline::{eval, Pipeline};

/// Collections of documents kept in memory.
///
/// Immutable once built, so it can be shared freely between tasks. Unknown
/// collections behave like empty ones, as they do on the server.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append documents to a collection.
    pub fn with_documents(
        mut self,
        collection: impl Into<String>,
        docs: impl IntoIterator<Item = Document>,
    ) -> Self {
        self.collections
            .entry(collection.into())
            .or_default()
            .extend(docs);
        self
    }

    /// Documents currently held for `collection`.
    pub fn documents(&self, collection: &str) -> &[Document] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl DocumentStore for MemoryStore {
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Document>> {
        eval::evaluate(self.documents(collection).to_vec(), pipeline)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

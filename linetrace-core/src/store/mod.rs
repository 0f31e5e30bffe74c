//! Document stores the lookups run against.
//!
//! - [`MongoStore`]: a live MongoDB deployment
//! - [`MemoryStore`]: collections held in memory, evaluated locally

use std::future::Future;

use bson::Document;

use crate::error::Result;
use crate::pipeline::Pipeline;

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::{MongoConfig, MongoStore};

/// Read-only access to named collections of documents.
pub trait DocumentStore: Send + Sync {
    /// Run `pipeline` against `collection` and collect every result document.
    fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Round-trip to the store without reading any collection.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;
}

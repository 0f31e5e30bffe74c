//! linetrace core - validated lookups over plan and production documents.
//!
//! This library provides:
//! - Identifier validation for plan, line, process and embedded-process ids
//! - Aggregation pipeline stages and an in-memory evaluator for them
//! - The plan-machine and production-process lookups
//! - Document stores: MongoDB and in-memory

pub mod error;
pub mod ids;
pub mod lookup;
pub mod pipeline;
pub mod store;

pub use error::{LookupError, Result};
pub use lookup::{CollectionNames, Lookups, Page, PlanMachineQuery, ProductionProcessQuery};
pub use pipeline::{Pipeline, Stage};
pub use store::{DocumentStore, MemoryStore, MongoConfig, MongoStore};

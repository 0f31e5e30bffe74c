//! The two lookups: a machine inside a plan, and an embedded process inside a
//! production record.
//!
//! Each query type validates its identifiers on construction and renders the
//! exact pipeline submitted to the store. [`Lookups`] pairs a store with the
//! collection names and runs them.

use std::collections::HashMap;

use bson::{doc, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LookupError, Result};
use crate::ids::{parse_object_id, HexId};
use crate::pipeline::{Level, Pipeline, Stage};
use crate::store::DocumentStore;

/// Fields kept on a plan document by the plan-machine lookup (plus `_id`).
pub const PLAN_PROJECTION: [&str; 4] = ["line", "aim_count", "line_num", "process_num"];

/// Sort keys giving plan-machine rows a total order when paginating.
const PLAN_ORDER: [&str; 4] = ["_id", "line.id", "line.process.id", "line.process.machine.name"];

/// Sort keys for production-process rows when paginating.
const PRODUCTION_ORDER: [&str; 2] = ["_id", "process_embed._id"];

/// Optional `$skip` / `$limit` appended to a lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    skip: Option<u64>,
    limit: Option<u64>,
}

impl Page {
    /// Build a page, rejecting a limit of zero.
    pub fn new(skip: Option<u64>, limit: Option<u64>) -> Result<Self> {
        if limit == Some(0) {
            return Err(LookupError::InvalidLimit);
        }
        Ok(Self { skip, limit })
    }

    /// No pagination.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

/// Locate a machine by name under a given plan, line and process.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanMachineQuery {
    pub plan_id: ObjectId,
    pub line_id: HexId,
    pub process_id: HexId,
    pub machine_name: String,
}

impl PlanMachineQuery {
    /// Validate the four identifiers.
    pub fn new(plan_id: &str, line_id: &str, process_id: &str, machine_name: &str) -> Result<Self> {
        let machine_name = machine_name.trim();
        if machine_name.is_empty() {
            return Err(LookupError::EmptyMachineName);
        }
        Ok(Self {
            plan_id: parse_object_id("plan id", plan_id)?,
            line_id: HexId::parse("line id", line_id)?,
            process_id: HexId::parse("process id", process_id)?,
            machine_name: machine_name.to_string(),
        })
    }

    /// The line -> process -> machine ownership chain with one filter per level.
    pub fn levels(&self) -> Vec<Level> {
        vec![
            Level::new("line", doc! { "line.id": self.line_id.as_str() }),
            Level::new(
                "line.process",
                doc! { "line.process.id": self.process_id.as_str() },
            ),
            Level::new(
                "line.process.machine",
                doc! { "line.process.machine.name": self.machine_name.as_str() },
            ),
        ]
    }

    /// Active plan with this id, projected, then expanded down the chain.
    pub fn pipeline(&self, page: &Page) -> Pipeline {
        Pipeline::new()
            .stage(Stage::Match(
                doc! { "_id": self.plan_id, "actived_status": true },
            ))
            .stage(Stage::project(PLAN_PROJECTION))
            .unwind_chain(&self.levels())
            .paginate(&PLAN_ORDER, page.skip, page.limit)
    }
}

/// Locate an embedded process record inside production documents.
///
/// Without `production_id` every production document is searched, matching
/// only on the embedded id. Setting it narrows the search to one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionProcessQuery {
    pub process_embed_id: ObjectId,
    pub production_id: Option<ObjectId>,
}

impl ProductionProcessQuery {
    pub fn new(process_embed_id: &str) -> Result<Self> {
        Ok(Self {
            process_embed_id: parse_object_id("process embed id", process_embed_id)?,
            production_id: None,
        })
    }

    /// Builder: also filter on the parent production id.
    pub fn in_production(mut self, production_id: &str) -> Result<Self> {
        self.production_id = Some(parse_object_id("production id", production_id)?);
        Ok(self)
    }

    pub fn pipeline(&self, page: &Page) -> Pipeline {
        let mut pipeline = Pipeline::new();
        if let Some(id) = self.production_id {
            pipeline.push(Stage::Match(doc! { "_id": id }));
        }
        pipeline
            .stage(Stage::project(["_id", "process_embed"]))
            .stage(Stage::Unwind("process_embed".to_string()))
            .stage(Stage::Match(
                doc! { "process_embed._id": self.process_embed_id },
            ))
            .paginate(&PRODUCTION_ORDER, page.skip, page.limit)
    }
}

/// Collection names the lookups run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub plan: String,
    pub production: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            plan: "plan".to_string(),
            production: "production".to_string(),
        }
    }
}

/// A store plus the collections to query.
pub struct Lookups<S> {
    store: S,
    collections: CollectionNames,
}

impl<S: DocumentStore> Lookups<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            collections: CollectionNames::default(),
        }
    }

    /// Builder: override collection names.
    pub fn with_collections(mut self, collections: CollectionNames) -> Self {
        self.collections = collections;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn collections(&self) -> &CollectionNames {
        &self.collections
    }

    /// Run the plan-machine lookup.
    ///
    /// Returns one document per matching nested path. Identifiers are assumed
    /// unique within their lists but this is not enforced; repeated plans are
    /// logged and returned as-is.
    pub async fn plan_machine(
        &self,
        query: &PlanMachineQuery,
        page: &Page,
    ) -> Result<Vec<Document>> {
        let pipeline = query.pipeline(page);
        debug!(
            collection = %self.collections.plan,
            plan_id = %query.plan_id,
            stages = pipeline.len(),
            "Running plan-machine lookup"
        );
        let rows = self
            .store
            .aggregate(&self.collections.plan, &pipeline)
            .await?;

        for (id, count) in repeated_ids(&rows) {
            warn!(
                plan_id = %id,
                count,
                "Plan matched more than one nested path; nested identifiers are not unique"
            );
        }
        Ok(rows)
    }

    /// Run the production-process lookup.
    pub async fn production_process(
        &self,
        query: &ProductionProcessQuery,
        page: &Page,
    ) -> Result<Vec<Document>> {
        let pipeline = query.pipeline(page);
        debug!(
            collection = %self.collections.production,
            process_embed_id = %query.process_embed_id,
            filtered_by_production = query.production_id.is_some(),
            "Running production-process lookup"
        );
        self.store
            .aggregate(&self.collections.production, &pipeline)
            .await
    }

    /// Check that the store answers.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

/// `_id` values appearing on more than one row, in first-seen order.
fn repeated_ids(rows: &[Document]) -> Vec<(Bson, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, (Bson, usize)> = HashMap::new();
    for id in rows.iter().filter_map(|row| row.get("_id")) {
        let key = id.to_string();
        counts
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                (id.clone(), 0)
            })
            .1 += 1;
    }
    order
        .into_iter()
        .filter_map(|key| counts.remove(&key))
        .filter(|(_, count)| *count > 1)
        .collect()
}

//! Aggregation pipeline stages.
//!
//! Only the stage kinds the lookups emit are modelled: equality `$match`,
//! inclusion `$project`, `$unwind`, ascending `$sort`, `$skip` and `$limit`. A [`Pipeline`] renders
//! to the `Vec<Document>` the driver submits, and [`eval`] runs the same
//! stages over documents held in memory.

use bson::{doc, Bson, Document};

pub mod eval;

pub use eval::{flatten_chain, Level};

/// One aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// `$match` with equality conditions keyed by dotted path.
    Match(Document),
    /// `$project` inclusion spec.
    Project(Document),
    /// `$unwind` of the array at a dotted path (stored without the `$`).
    Unwind(String),
    /// `$sort` spec, dotted path to `1` or `-1`.
    Sort(Document),
    /// `$skip`
    Skip(u64),
    /// `$limit`
    Limit(u64),
}

impl Stage {
    /// Inclusion projection of the given top-level fields.
    pub fn project<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut spec = Document::new();
        for field in fields {
            spec.insert(field, 1);
        }
        Stage::Project(spec)
    }

    /// Name of the operator, e.g. `$unwind`.
    pub fn operator(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Project(_) => "$project",
            Stage::Unwind(_) => "$unwind",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
        }
    }

    /// Render as the document the server expects.
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Match(filter) => doc! { "$match": filter.clone() },
            Stage::Project(spec) => doc! { "$project": spec.clone() },
            Stage::Unwind(path) => doc! { "$unwind": format!("${}", path) },
            Stage::Sort(spec) => doc! { "$sort": spec.clone() },
            Stage::Skip(n) => doc! { "$skip": Bson::Int64(saturating_i64(*n)) },
            Stage::Limit(n) => doc! { "$limit": Bson::Int64(saturating_i64(*n)) },
        }
    }
}

fn saturating_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Ordered list of stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a stage in place.
    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Append an `$unwind` followed by a `$match` for every level of a chain.
    pub fn unwind_chain(mut self, levels: &[Level]) -> Self {
        for level in levels {
            self.stages.push(Stage::Unwind(level.path.clone()));
            self.stages.push(Stage::Match(level.filter.clone()));
        }
        self
    }

    /// Append `$skip` / `$limit` when set, preceded by an ascending `$sort`
    /// on `order` so consecutive pages neither overlap nor skip rows.
    pub fn paginate(mut self, order: &[&str], skip: Option<u64>, limit: Option<u64>) -> Self {
        let skip = skip.filter(|n| *n > 0);
        if skip.is_none() && limit.is_none() {
            return self;
        }
        if !order.is_empty() {
            let mut spec = Document::new();
            for path in order {
                spec.insert(*path, 1);
            }
            self.stages.push(Stage::Sort(spec));
        }
        if let Some(n) = skip {
            self.stages.push(Stage::Skip(n));
        }
        if let Some(n) = limit {
            self.stages.push(Stage::Limit(n));
        }
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Render every stage for submission to the driver.
    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

impl IntoIterator for Pipeline {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_documents().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_documents() {
        assert_eq!(
            Stage::Unwind("line.process".into()).to_document(),
            doc! { "$unwind": "$line.process" }
        );
        assert_eq!(
            Stage::project(["_id", "process_embed"]).to_document(),
            doc! { "$project": { "_id": 1, "process_embed": 1 } }
        );
        assert_eq!(
            Stage::Limit(5).to_document(),
            doc! { "$limit": Bson::Int64(5) }
        );
    }

    #[test]
    fn test_unwind_chain_interleaves_stages() {
        let levels = vec![
            Level::new("line", doc! { "line.id": "a" }),
            Level::new("line.process", doc! { "line.process.id": "b" }),
        ];
        let pipeline = Pipeline::new().unwind_chain(&levels);

        let operators: Vec<_> = pipeline.stages().iter().map(Stage::operator).collect();
        assert_eq!(operators, ["$unwind", "$match", "$unwind", "$match"]);
    }

    #[test]
    fn test_paginate() {
        let pipeline = Pipeline::new().paginate(&["_id"], Some(0), None);
        assert!(pipeline.is_empty(), "skip of zero adds nothing");

        let pipeline = Pipeline::new().paginate(&["_id", "line.id"], Some(10), Some(20));
        assert_eq!(
            pipeline.stages(),
            &[
                Stage::Sort(doc! { "_id": 1, "line.id": 1 }),
                Stage::Skip(10),
                Stage::Limit(20)
            ]
        );
        assert_eq!(
            pipeline.to_documents()[0],
            doc! { "$sort": { "_id": 1, "line.id": 1 } }
        );
    }
}

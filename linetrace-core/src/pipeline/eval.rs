//! In-memory evaluation of pipeline stages.
//!
//! Mirrors the server's behaviour for the subset of stages in [`Stage`]:
//!
//! - `$match` compares by equality; a dotted path reaching into an array of
//!   sub-documents matches when any element matches, and an array value
//!   matches when it contains the expected value.
//! - `$unwind` emits one document per array element; a missing, null or empty
//!   array emits nothing, and a non-array value passes through unchanged.
//! - `$project` is inclusion-only over top-level fields, `_id` kept unless
//!   explicitly excluded.
//! - `$sort` orders by the server's cross-type order for the scalar types
//!   the lookups produce; ties keep their input order.

use std::cmp::Ordering;

use bson::{Bson, Document};

use super::{Pipeline, Stage};
use crate::error::{LookupError, Result};

/// One level of an ownership chain: the array to expand and the filter the
/// expanded rows must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// Dotted path of the array, relative to the root document.
    pub path: String,
    /// Equality filter applied after expansion.
    pub filter: Document,
}

impl Level {
    pub fn new(path: impl Into<String>, filter: Document) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }
}

/// Expand `doc` level by level, keeping only the rows that pass each filter.
///
/// The result is the filtered cross product of the nested lists: one document
/// per surviving path, each with every array on the chain narrowed to a
/// single element.
pub fn flatten_chain(doc: &Document, levels: &[Level]) -> Vec<Document> {
    levels.iter().fold(vec![doc.clone()], |rows, level| {
        rows.iter()
            .flat_map(|row| unwind(row, &level.path))
            .filter(|row| matches(row, &level.filter))
            .collect()
    })
}

/// Run every stage of `pipeline` over `docs`.
pub fn evaluate(docs: Vec<Document>, pipeline: &Pipeline) -> Result<Vec<Document>> {
    let mut rows = docs;
    for stage in pipeline.stages() {
        rows = match stage {
            Stage::Match(filter) => rows.into_iter().filter(|d| matches(d, filter)).collect(),
            Stage::Project(spec) => rows
                .iter()
                .map(|d| project(d, spec))
                .collect::<Result<Vec<_>>>()?,
            Stage::Unwind(path) => rows.iter().flat_map(|d| unwind(d, path)).collect(),
            Stage::Sort(spec) => sort(rows, spec),
            Stage::Skip(n) => rows.into_iter().skip(to_usize(*n)).collect(),
            Stage::Limit(n) => rows.into_iter().take(to_usize(*n)).collect(),
        };
    }
    Ok(rows)
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// One document per element of the array at `path`.
pub fn unwind(doc: &Document, path: &str) -> Vec<Document> {
    match get_path(doc, path) {
        Some(Bson::Array(items)) => items
            .iter()
            .map(|item| {
                let mut row = doc.clone();
                set_path(&mut row, path, item.clone());
                row
            })
            .collect(),
        None | Some(Bson::Null) => Vec::new(),
        Some(_) => vec![doc.clone()],
    }
}

/// True when every condition in `filter` holds for `doc`.
pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(path, expected)| {
        let found = values_at(doc, path);
        if found.is_empty() {
            return matches!(expected, Bson::Null);
        }
        found.into_iter().any(|value| match value {
            Bson::Array(items) => {
                bson_eq(value, expected) || items.iter().any(|item| bson_eq(item, expected))
            }
            _ => bson_eq(value, expected),
        })
    })
}

/// Stable sort by every path in `spec`; a negative direction reverses it.
pub fn sort(mut rows: Vec<Document>, spec: &Document) -> Vec<Document> {
    rows.sort_by(|a, b| {
        spec.iter()
            .map(|(path, direction)| {
                let ord = compare(get_path(a, path), get_path(b, path));
                if as_number(direction).is_some_and(|d| d < 0.0) {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    rows
}

/// Server ordering: missing and null first, then numbers, strings,
/// documents, arrays, ObjectIds, booleans and dates.
fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let (a, b) = (a.unwrap_or(&Bson::Null), b.unwrap_or(&Bson::Null));
    match type_rank(a).cmp(&type_rank(b)) {
        Ordering::Equal => {}
        other => return other,
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::MinKey => 0,
        _ => 10,
    }
}

/// Inclusion projection over top-level fields.
pub fn project(doc: &Document, spec: &Document) -> Result<Document> {
    for (field, flag) in spec {
        if field.contains('.') {
            return Err(LookupError::UnsupportedStage(format!(
                "$project of nested path '{}'",
                field
            )));
        }
        if field != "_id" && !is_included(flag) {
            return Err(LookupError::UnsupportedStage(format!(
                "$project exclusion of '{}'",
                field
            )));
        }
    }

    let keep_id = spec.get("_id").map(is_included).unwrap_or(true);
    let mut out = Document::new();
    for (field, value) in doc {
        let keep = if field == "_id" {
            keep_id
        } else {
            spec.contains_key(field)
        };
        if keep {
            out.insert(field.clone(), value.clone());
        }
    }
    Ok(out)
}

fn is_included(flag: &Bson) -> bool {
    match flag {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => false,
    }
}

/// Value at a dotted path, without descending into arrays.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(child) => child.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(child)) = doc.get_mut(head) {
                set_path(child, rest, value);
            }
        }
    }
}

/// Every value reachable at a dotted path, descending into arrays of
/// sub-documents the way the server does for queries.
fn values_at<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((head, rest)) = parts.split_first() {
        if let Some(value) = doc.get(*head) {
            collect_values(value, rest, &mut out);
        }
    }
    out
}

fn collect_values<'a>(value: &'a Bson, parts: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = parts.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(child) => {
            if let Some(next) = child.get(*head) {
                collect_values(next, rest, out);
            }
        }
        Bson::Array(items) => {
            for item in items.iter().filter(|i| matches!(i, Bson::Document(_))) {
                collect_values(item, parts, out);
            }
        }
        _ => {}
    }
}

/// Equality with numeric types compared by value.
fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

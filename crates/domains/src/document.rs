//! # Document Model
//!
//! The storage contract speaks in schemaless JSON documents. This module
//! holds the shared semantics of that contract (field paths, equality
//! filters, sort keys and update operators) so every `DocumentStore`
//! adapter evaluates them identically.
//!
//! Field paths are dotted (`voteTally.netScore`). An [`Update`] is applied
//! to a single document as one unit: either every operator lands or the
//! document is left untouched.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::errors::{DomainError, DomainResult};

/// A stored document. Always a JSON object.
pub type Document = Map<String, Value>;

/// Identifier field present on every stored document.
pub const ID_FIELD: &str = "_id";

/// Resolves a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Returns the `_id` of a document as a string, if present.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Walks to the slot addressed by `path`, creating intermediate objects
/// and a `null` leaf on the way.
fn slot_mut<'a>(doc: &'a mut Document, path: &str) -> DomainResult<&'a mut Value> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut container: &mut Document = doc;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            container = match container
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
            {
                Value::Object(map) => map,
                _ => {
                    return Err(DomainError::Store(format!(
                        "field `{segment}` on path `{path}` is not an object"
                    )))
                }
            };
        }
    }
    Ok(container.entry(leaf.to_string()).or_insert(Value::Null))
}

// ─── Filter ─────────────────────────────────────────────────────────────────

/// Conjunction of equality clauses. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl ToString) -> Self {
        Self::all().eq(ID_FIELD, id.to_string())
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(path, expected)| lookup(doc, path) == Some(expected))
    }

    /// Builds the document an upsert starts from: every equality clause
    /// written into an otherwise empty document.
    pub fn seed(&self) -> DomainResult<Document> {
        let mut doc = Document::new();
        for (path, value) in &self.clauses {
            *slot_mut(&mut doc, path)? = value.clone();
        }
        Ok(doc)
    }
}

// ─── Sort ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Ordered list of sort keys; later keys break ties of earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    keys: Vec<(String, SortOrder)>,
}

impl Sort {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ascending(mut self, path: impl Into<String>) -> Self {
        self.keys.push((path.into(), SortOrder::Ascending));
        self
    }

    pub fn descending(mut self, path: impl Into<String>) -> Self {
        self.keys.push((path.into(), SortOrder::Descending));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (path, order) in &self.keys {
            let ordering = compare_values(lookup(a, path), lookup(b, path));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort; equal documents keep their stored order.
    pub fn apply(&self, docs: &mut [Document]) {
        if !self.is_empty() {
            docs.sort_by(|a, b| self.compare(a, b));
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

static NULL: Value = Value::Null;

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&NULL);
    let b = b.unwrap_or(&NULL);
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .unwrap_or_default()
                .total_cmp(&y.as_f64().unwrap_or_default()),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// ─── Update ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set { path: String, value: Value },
    Inc { path: String, by: i64 },
    Push { path: String, value: Value },
}

impl UpdateOp {
    fn path(&self) -> &str {
        match self {
            UpdateOp::Set { path, .. } | UpdateOp::Inc { path, .. } | UpdateOp::Push { path, .. } => {
                path
            }
        }
    }

    fn apply(&self, doc: &mut Document) -> DomainResult<()> {
        if self.path() == ID_FIELD {
            return Err(DomainError::Store("`_id` cannot be updated".into()));
        }

        match self {
            UpdateOp::Set { path, value } => {
                *slot_mut(doc, path)? = value.clone();
            }
            UpdateOp::Inc { path, by } => {
                let slot = slot_mut(doc, path)?;
                let current = match &*slot {
                    Value::Null => 0,
                    Value::Number(n) => n.as_i64().ok_or_else(|| {
                        DomainError::Store(format!("field `{path}` is not an integer"))
                    })?,
                    _ => {
                        return Err(DomainError::Store(format!(
                            "cannot increment non-numeric field `{path}`"
                        )))
                    }
                };
                let next = current
                    .checked_add(*by)
                    .ok_or_else(|| DomainError::Store(format!("increment of `{path}` overflows")))?;
                *slot = Value::from(next);
            }
            UpdateOp::Push { path, value } => {
                let slot = slot_mut(doc, path)?;
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }
                match slot {
                    Value::Array(items) => items.push(value.clone()),
                    _ => {
                        return Err(DomainError::Store(format!(
                            "cannot push onto non-array field `{path}`"
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

/// A batch of operators executed against one document as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn inc(mut self, path: impl Into<String>, by: i64) -> Self {
        self.ops.push(UpdateOp::Inc {
            path: path.into(),
            by,
        });
        self
    }

    pub fn push(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every operator in order. On error the document is unchanged.
    pub fn apply(&self, doc: &mut Document) -> DomainResult<()> {
        let mut staged = doc.clone();
        for op in &self.ops {
            op.apply(&mut staged)?;
        }
        *doc = staged;
        Ok(())
    }
}

//! Patch operations and their generation from two value trees.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::fieldpath::{Path, PathElement};
use crate::value::{Map, Value};

/// Operation is the kind of a patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Remove,
    Replace,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => write!(f, "add"),
            Operation::Remove => write!(f, "remove"),
            Operation::Replace => write!(f, "replace"),
        }
    }
}

/// PatchOperation is a single edit at a path, serialized as an RFC 6902 object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOperation {
    pub op: Operation,
    pub path: Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Creates an add operation.
    pub fn add(path: Path, value: Value) -> Self {
        PatchOperation {
            op: Operation::Add,
            path,
            value: Some(value),
        }
    }

    /// Creates a remove operation.
    pub fn remove(path: Path) -> Self {
        PatchOperation {
            op: Operation::Remove,
            path,
            value: None,
        }
    }

    /// Creates a replace operation.
    pub fn replace(path: Path, value: Value) -> Self {
        PatchOperation {
            op: Operation::Replace,
            path,
            value: Some(value),
        }
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.path)
    }
}

/// Generates the operations that turn `base` into `target`.
///
/// Map keys are visited in `target` order (adds and nested changes), then keys only
/// in `base` are removed in `base` order. List elements are compared by index;
/// surplus target elements are added in ascending order and surplus base elements
/// removed in descending order, so the operations can be applied one after the
/// other. A type change at a path is a single replace of the whole subtree.
pub fn generate(base: &Value, target: &Value) -> Vec<PatchOperation> {
    let mut ops = Vec::new();
    diff_values(base, target, Path::new(), &mut ops);
    ops
}

fn diff_values(base: &Value, target: &Value, path: Path, ops: &mut Vec<PatchOperation>) {
    match (base, target) {
        (Value::Map(b), Value::Map(t)) => diff_maps(b, t, path, ops),
        (Value::List(b), Value::List(t)) => diff_lists(b, t, path, ops),
        _ => {
            if base != target {
                ops.push(PatchOperation::replace(path, target.clone()));
            }
        }
    }
}

fn diff_maps(base: &Map, target: &Map, path: Path, ops: &mut Vec<PatchOperation>) {
    for (key, target_value) in target.iter() {
        let child = path.with(PathElement::field_name(key.clone()));
        match base.get(key) {
            None => ops.push(PatchOperation::add(child, target_value.clone())),
            Some(base_value) if base_value != target_value => {
                diff_values(base_value, target_value, child, ops)
            }
            Some(_) => {}
        }
    }

    for key in base.keys() {
        if !target.has(key) {
            ops.push(PatchOperation::remove(
                path.with(PathElement::field_name(key.clone())),
            ));
        }
    }
}

fn diff_lists(base: &[Value], target: &[Value], path: Path, ops: &mut Vec<PatchOperation>) {
    let common = base.len().min(target.len());

    for (i, (base_value, target_value)) in base.iter().zip(target.iter()).enumerate() {
        if base_value != target_value {
            diff_values(base_value, target_value, path.with(PathElement::index(i)), ops);
        }
    }

    for (i, target_value) in target.iter().enumerate().skip(common) {
        ops.push(PatchOperation::add(
            path.with(PathElement::index(i)),
            target_value.clone(),
        ));
    }

    for i in (common..base.len()).rev() {
        ops.push(PatchOperation::remove(path.with(PathElement::index(i))));
    }
}

/// Applies operations to a copy of `base`, in order.
pub fn apply(base: &Value, ops: &[PatchOperation]) -> Result<Value> {
    let mut doc = base.clone();
    for op in ops {
        apply_one(&mut doc, op)?;
    }
    Ok(doc)
}

impl Value {
    /// Returns a copy of this value with the operations applied.
    pub fn apply_patch(&self, ops: &[PatchOperation]) -> Result<Value> {
        apply(self, ops)
    }
}

fn apply_one(doc: &mut Value, op: &PatchOperation) -> Result<()> {
    match op.op {
        Operation::Add => {
            let value = required_value(op)?;
            doc.insert_path(&op.path, value)
        }
        Operation::Remove => {
            if op.path.is_empty() {
                return Err(Error::patch("", "cannot remove the whole document"));
            }
            doc.delete_path(&op.path)
                .map(|_| ())
                .ok_or_else(|| Error::patch(op.path.to_string(), "path does not exist"))
        }
        Operation::Replace => {
            let value = required_value(op)?;
            if !doc.has_path(&op.path) {
                return Err(Error::patch(op.path.to_string(), "path does not exist"));
            }
            doc.set_path(&op.path, value)
        }
    }
}

fn required_value(op: &PatchOperation) -> Result<Value> {
    op.value
        .clone()
        .ok_or_else(|| Error::patch(op.path.to_string(), format!("{} requires a value", op.op)))
}

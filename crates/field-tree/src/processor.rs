//! Walks a response together with the field tree that requested it.
//!
//! The walk is post-order: a node's children are fully resolved before its calculators
//! run, the node's result is then sealed, and only after that the node's transformer
//! may replace it. The tree is only ever read.

use async_recursion::async_recursion;
use futures::future;
use indexmap::IndexMap;

use crate::builder::Operation;
use crate::error::ProcessError;
use crate::node::BoxError;
use crate::node::FieldNode;
use crate::node::Tag;
use crate::value::SealViolation;
use crate::value::Value;

/// Process every root of `operation` against the `data` of a response, then freeze it.
///
/// Roots missing from `data` are skipped.
pub async fn process_response<O>(operation: &O, data: &mut Value) -> Result<(), ProcessError>
where
    O: Operation + ?Sized,
{
    if let Value::Object(object) = &mut *data {
        for root in operation.roots() {
            if let Some(value) = object.get_mut(root.name())? {
                process_selection(&[root], value).await?;
            }
        }
    }
    data.freeze();
    Ok(())
}

/// Process `slot`, the value the response holds for `node`.
///
/// Leaves are left untouched, including any calculator or transformer declared on them.
/// Lists are processed element by element, each element being replaced by its own
/// transformed value.
pub async fn process(node: &FieldNode, slot: &mut Value) -> Result<(), ProcessError> {
    process_selection(&[node], slot).await
}

/// Process `slot` against every node selecting the same response key.
///
/// More than one node answers under a key when a parent and its inline fragments, or
/// several fragments, select the same field. Their selections are merged so the value
/// is walked once.
#[async_recursion]
async fn process_selection(nodes: &[&FieldNode], slot: &mut Value) -> Result<(), ProcessError> {
    if nodes.iter().all(|node| node.is_leaf()) {
        return Ok(());
    }

    if let Value::Array(items) = &mut *slot {
        tracing::trace!(field = field_name(nodes), len = items.len(), "processing list");
        future::try_join_all(items.iter_mut().map(|item| process_selection(nodes, item))).await?;
        return Ok(());
    }

    resolve(nodes, slot).await
}

async fn resolve(nodes: &[&FieldNode], slot: &mut Value) -> Result<(), ProcessError> {
    let field = field_name(nodes);
    let object = match &mut *slot {
        Value::Object(object) => object,
        Value::Null => return Ok(()),
        other => {
            tracing::debug!(
                field = field,
                found = other.kind(),
                "expected an object, leaving the value as is"
            );
            return Ok(());
        }
    };

    if object.is_sealed() {
        return Err(ProcessError::AlreadySealed {
            field: field.to_owned(),
        });
    }

    for (key, selection) in merged_children(nodes) {
        if let Some(value) = object.get_mut(key)? {
            process_selection(&selection, value).await?;
        }
    }

    for node in nodes {
        for (name, calculator) in node.calculators() {
            let value = calculator.calculate(&*slot).await.map_err(|error| {
                user_error(error, |reason| ProcessError::Calculator {
                    field: field.to_owned(),
                    name: name.to_owned(),
                    reason,
                })
            })?;
            if let Value::Object(object) = &mut *slot {
                object.insert(name, value)?;
            }
        }
    }

    slot.seal();

    for transformer in nodes.iter().filter_map(|node| node.transformer()) {
        let resolved = std::mem::take(slot);
        *slot = transformer.transform(resolved).await.map_err(|error| {
            user_error(error, |reason| ProcessError::Transformer {
                field: field.to_owned(),
                reason,
            })
        })?;
    }

    Ok(())
}

fn field_name<'a>(nodes: &[&'a FieldNode]) -> &'a str {
    nodes.first().map(|node| node.name()).unwrap_or_default()
}

/// Children selected by `nodes`, inline fragments flattened, grouped by response key
/// in first-selection order.
fn merged_children<'a>(nodes: &[&'a FieldNode]) -> IndexMap<&'a str, Vec<&'a FieldNode>> {
    let mut merged = IndexMap::new();
    for node in nodes {
        collect_children(node, &mut merged);
    }
    merged
}

fn collect_children<'a>(node: &'a FieldNode, merged: &mut IndexMap<&'a str, Vec<&'a FieldNode>>) {
    for child in node.children() {
        match child.tag() {
            Tag::InlineFragment => collect_children(child, merged),
            _ => merged.entry(child.name()).or_default().push(child),
        }
    }
}

// A seal violation raised inside user code is still a seal violation.
fn user_error(error: BoxError, otherwise: impl FnOnce(String) -> ProcessError) -> ProcessError {
    match error.downcast::<SealViolation>() {
        Ok(violation) => ProcessError::Seal(*violation),
        Err(error) => otherwise(error.to_string()),
    }
}

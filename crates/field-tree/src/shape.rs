//! Shapes derived from field trees.
//!
//! A [`Shape`] is the schema a tree implies, computed when the tree is built. The
//! response shape describes what the server must answer with and can be checked
//! against a parsed response before processing. The result shape additionally
//! accounts for calculators and transformers.

use displaydoc::Display;
use indexmap::IndexMap;
use thiserror::Error;

use crate::node::FieldNode;
use crate::node::Tag;
use crate::value::Value;

/// A value that does not fit the shape of the tree.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
pub enum ShapeError {
    /// expected {expected} at '{path}', found {found}
    Mismatch {
        /// Where the mismatch was found.
        path: String,
        /// Description of the expected shape.
        expected: String,
        /// Kind of the value that was found.
        found: String,
    },

    /// unexpected field at '{path}'
    UnexpectedField {
        /// Path of the undeclared field.
        path: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Shape {
    /// Scalars, custom scalars and anything produced by user code.
    Any,
    /// An object with declared fields. A list of such objects also fits.
    Object {
        type_name: Option<String>,
        fields: IndexMap<String, Shape>,
    },
    /// A list of values of the inner shape.
    List(Box<Shape>),
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Stage {
    Response,
    Result,
}

impl Shape {
    /// Shape of a response `data` object answering `roots`.
    pub fn for_response(roots: &[&FieldNode]) -> Shape {
        Self::for_roots(roots, Stage::Response)
    }

    /// Shape of the processed result for `roots`.
    pub fn for_result(roots: &[&FieldNode]) -> Shape {
        Self::for_roots(roots, Stage::Result)
    }

    /// Shape the server is expected to return for `node`.
    pub fn of_response(node: &FieldNode) -> Shape {
        Self::of(node, Stage::Response)
    }

    /// Shape of `node` once processed.
    pub fn of_result(node: &FieldNode) -> Shape {
        Self::of(node, Stage::Result)
    }

    fn for_roots(roots: &[&FieldNode], stage: Stage) -> Shape {
        Shape::Object {
            type_name: None,
            fields: roots
                .iter()
                .map(|root| (root.name().to_owned(), Self::of(root, stage)))
                .collect(),
        }
    }

    fn of(node: &FieldNode, stage: Stage) -> Shape {
        if node.is_leaf() {
            return Shape::Any;
        }

        let element = if stage == Stage::Result && node.transformer().is_some() {
            Shape::Any
        } else {
            let mut fields = IndexMap::new();
            Self::collect_fields(node, stage, &mut fields);
            if stage == Stage::Result {
                for (name, _) in node.calculators() {
                    fields.insert(name.to_owned(), Shape::Any);
                }
            }
            Shape::Object {
                type_name: node.result_type().map(str::to_owned),
                fields,
            }
        };

        if node.is_list_result() {
            Shape::List(Box::new(element))
        } else {
            element
        }
    }

    // Fragment fields join the parent's. A key selected more than once gets the union
    // of its selections.
    fn collect_fields(node: &FieldNode, stage: Stage, fields: &mut IndexMap<String, Shape>) {
        for child in node.children() {
            match child.tag() {
                Tag::InlineFragment => Self::collect_fields(child, stage, fields),
                _ => {
                    let shape = Self::of(child, stage);
                    match fields.get_mut(child.name()) {
                        Some(existing) => {
                            let current = std::mem::replace(existing, Shape::Any);
                            *existing = current.merge(shape);
                        }
                        None => {
                            fields.insert(child.name().to_owned(), shape);
                        }
                    }
                }
            }
        }
    }

    /// Union of two selections of the same key. Anything that does not line up is `Any`.
    fn merge(self, other: Shape) -> Shape {
        match (self, other) {
            (
                Shape::Object {
                    type_name,
                    mut fields,
                },
                Shape::Object {
                    type_name: other_type_name,
                    fields: other_fields,
                },
            ) => {
                for (name, shape) in other_fields {
                    match fields.get_mut(&name) {
                        Some(existing) => {
                            let current = std::mem::replace(existing, Shape::Any);
                            *existing = current.merge(shape);
                        }
                        None => {
                            fields.insert(name, shape);
                        }
                    }
                }
                Shape::Object {
                    type_name: type_name.or(other_type_name),
                    fields,
                }
            }
            (Shape::List(inner), Shape::List(other)) => Shape::List(Box::new(inner.merge(*other))),
            _ => Shape::Any,
        }
    }

    /// Human readable description, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Shape::Any => "any value".to_owned(),
            Shape::Object {
                type_name: Some(type_name),
                ..
            } => type_name.clone(),
            Shape::Object { .. } => "object".to_owned(),
            Shape::List(inner) => format!("list of {}", inner.describe()),
        }
    }

    /// Check `value` against this shape.
    ///
    /// Nulls fit anywhere and declared fields may be absent. Fields the tree did not
    /// declare are rejected.
    pub fn validate(&self, value: &Value) -> Result<(), ShapeError> {
        self.check(value, &mut Vec::new())
    }

    fn check(&self, value: &Value, path: &mut Vec<String>) -> Result<(), ShapeError> {
        match (self, value) {
            (Shape::Any, _) | (_, Value::Null) => Ok(()),
            (Shape::List(inner), Value::Array(items)) => check_items(inner, items, path),
            (Shape::Object { .. }, Value::Array(items)) => check_items(self, items, path),
            (Shape::Object { fields, .. }, Value::Object(object)) => {
                for (key, value) in object.iter() {
                    path.push(key.to_owned());
                    match fields.get(key) {
                        Some(shape) => shape.check(value, path)?,
                        None => {
                            return Err(ShapeError::UnexpectedField {
                                path: path.join("/"),
                            })
                        }
                    }
                    path.pop();
                }
                Ok(())
            }
            (expected, found) => Err(ShapeError::Mismatch {
                path: path.join("/"),
                expected: expected.describe(),
                found: found.kind().to_owned(),
            }),
        }
    }
}

fn check_items(shape: &Shape, items: &[Value], path: &mut Vec<String>) -> Result<(), ShapeError> {
    for (index, item) in items.iter().enumerate() {
        path.push(index.to_string());
        shape.check(item, path)?;
        path.pop();
    }
    Ok(())
}

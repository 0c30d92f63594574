//! The object model for a field tree.
//!
//! A field tree describes which fields a caller wants back from the server and how the
//! received data should be post-processed. It is assembled with the builders in
//! [`crate::builder`] and read (never written) by serialization and processing.

use std::sync::Arc;

use derivative::Derivative;
use derive_more::Display;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::error::FieldTreeError;
use crate::value::Value;

/// Error type returned by fallible calculators and transformers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a node represents.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// A nested selection.
    Field,
    /// The root of a query.
    Query,
    /// The root of a mutation.
    Mutation,
    /// A branch that only applies to one concrete type. Its children belong to the
    /// parent's selection.
    InlineFragment,
}

/// The operation type keyword of a request document.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[display("query")]
    Query,
    #[display("mutation")]
    Mutation,
}

/// A field argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    /// Any JSON value, written as the matching GraphQL literal.
    Literal(serde_json::Value),
    /// An enum value, written bare.
    Enum(String),
}

impl Argument {
    /// An enum value such as `RED`, written without quotes.
    pub fn enum_value(name: impl Into<String>) -> Self {
        Argument::Enum(name.into())
    }
}

macro_rules! literal_argument {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::Literal(value.into())
                }
            }
        )*
    };
}

literal_argument!(serde_json::Value, &str, String, bool, i32, i64, u32, u64, f64);

type SyncCalculatorFn = dyn Fn(&Value) -> Value + Send + Sync;
type AsyncCalculatorFn =
    dyn for<'a> Fn(&'a Value) -> BoxFuture<'a, Result<Value, BoxError>> + Send + Sync;
type SyncTransformerFn = dyn Fn(Value) -> Value + Send + Sync;
type AsyncTransformerFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync;

/// Derives a new field from a node's resolved result.
#[derive(Clone)]
pub enum Calculator {
    Sync(Arc<SyncCalculatorFn>),
    Async(Arc<AsyncCalculatorFn>),
}

impl Calculator {
    /// Compute the field from `resolved`, the node's result with its children processed.
    pub async fn calculate(&self, resolved: &Value) -> Result<Value, BoxError> {
        match self {
            Calculator::Sync(calculate) => Ok(calculate(resolved)),
            Calculator::Async(calculate) => calculate(resolved).await,
        }
    }
}

/// Replaces a node's resolved result with a derived value.
#[derive(Clone)]
pub enum Transformer {
    Sync(Arc<SyncTransformerFn>),
    Async(Arc<AsyncTransformerFn>),
}

impl Transformer {
    /// Produce the value replacing `resolved`.
    pub async fn transform(&self, resolved: Value) -> Result<Value, BoxError> {
        match self {
            Transformer::Sync(transform) => Ok(transform(resolved)),
            Transformer::Async(transform) => transform(resolved).await,
        }
    }
}

/// A named node of a field tree.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct FieldNode {
    name: String,
    tag: Tag,
    result_type: Option<String>,
    list_result: bool,
    arguments: IndexMap<String, Argument>,
    children: IndexMap<String, FieldNode>,
    #[derivative(Debug(format_with = "format_keys"))]
    calculators: IndexMap<String, Calculator>,
    #[derivative(Debug(format_with = "format_transformer"))]
    transformer: Option<Transformer>,
}

fn format_keys(
    calculators: &IndexMap<String, Calculator>,
    fmt: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    fmt.debug_list().entries(calculators.keys()).finish()
}

fn format_transformer(
    transformer: &Option<Transformer>,
    fmt: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    fmt.write_str(if transformer.is_some() { "Some(..)" } else { "None" })
}

impl FieldNode {
    pub(crate) fn new(name: impl Into<String>, tag: Tag) -> Self {
        Self {
            name: name.into(),
            tag,
            result_type: None,
            list_result: false,
            arguments: IndexMap::new(),
            children: IndexMap::new(),
            calculators: IndexMap::new(),
            transformer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The declared GraphQL type of a root's result, if any.
    pub fn result_type(&self) -> Option<&str> {
        self.result_type.as_deref()
    }

    /// Whether the server returns a list for this root.
    pub fn is_list_result(&self) -> bool {
        self.list_result
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn arguments(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.arguments.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = &FieldNode> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&FieldNode> {
        self.children.get(name)
    }

    /// Calculators in declaration order.
    pub fn calculators(&self) -> impl Iterator<Item = (&str, &Calculator)> {
        self.calculators
            .iter()
            .map(|(name, calculator)| (name.as_str(), calculator))
    }

    pub fn transformer(&self) -> Option<&Transformer> {
        self.transformer.as_ref()
    }

    pub(crate) fn add_child(&mut self, child: FieldNode) -> Result<(), FieldTreeError> {
        if self.children.contains_key(&child.name) {
            return Err(FieldTreeError::DuplicateField {
                parent: self.name.clone(),
                name: child.name,
            });
        }
        self.children.insert(child.name.clone(), child);
        Ok(())
    }

    pub(crate) fn add_calculator(
        &mut self,
        name: String,
        calculator: Calculator,
    ) -> Result<(), FieldTreeError> {
        if self.calculators.contains_key(&name) {
            return Err(FieldTreeError::DuplicateCalculator {
                parent: self.name.clone(),
                name,
            });
        }
        self.calculators.insert(name, calculator);
        Ok(())
    }

    pub(crate) fn set_transformer(&mut self, transformer: Transformer) {
        self.transformer = Some(transformer);
    }

    pub(crate) fn set_argument(&mut self, name: String, value: Argument) {
        self.arguments.insert(name, value);
    }

    pub(crate) fn set_result_type(&mut self, result_type: String) {
        self.result_type = Some(result_type);
    }

    pub(crate) fn set_list_result(&mut self, list_result: bool) {
        self.list_result = list_result;
    }
}

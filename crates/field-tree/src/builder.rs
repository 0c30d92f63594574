//! Fluent builders for field trees.
//!
//! ```ignore
//! let query = Query::new("person")
//!     .add_field("name")?
//!     .add_field(Field::new("mother").add_field("name")?)?
//!     .calculated("initial", |person| person.get("name").cloned().unwrap_or_default())?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::FieldTreeError;
use crate::node::Argument;
use crate::node::BoxError;
use crate::node::Calculator;
use crate::node::FieldNode;
use crate::node::OperationKind;
use crate::node::Tag;
use crate::node::Transformer;
use crate::shape::Shape;
use crate::value::Value;

/// Anything that can be attached below another node.
pub trait IntoChild {
    fn into_child(self) -> FieldNode;
}

/// Anything that can be sent as the root of a request.
pub trait IntoRoot {
    fn into_root(self) -> FieldNode;
}

/// A request made of one or more root nodes of the same kind.
pub trait Operation {
    fn kind(&self) -> OperationKind;

    /// Root nodes, in the order they are sent.
    fn roots(&self) -> Vec<&FieldNode>;

    /// Shape the server is expected to answer with.
    fn response_shape(&self) -> Shape {
        Shape::for_response(&self.roots())
    }

    /// Shape of the result once calculators and transformers ran.
    fn result_shape(&self) -> Shape {
        Shape::for_result(&self.roots())
    }
}

macro_rules! selection_methods {
    ($builder:ident) => {
        impl $builder {
            /// Append a child selection.
            ///
            /// Fails if a sibling with the same name already exists.
            pub fn add_field(mut self, child: impl IntoChild) -> Result<Self, FieldTreeError> {
                self.0.add_child(child.into_child())?;
                Ok(self)
            }

            pub fn node(&self) -> &FieldNode {
                &self.0
            }

            pub fn into_node(self) -> FieldNode {
                self.0
            }
        }
    };
}

macro_rules! computed_methods {
    ($builder:ident) => {
        impl $builder {
            /// Set an argument, replacing any previous value for the same name.
            pub fn argument(mut self, name: impl Into<String>, value: impl Into<Argument>) -> Self {
                self.0.set_argument(name.into(), value.into());
                self
            }

            /// Add a field computed from this node's resolved result.
            pub fn calculated<F>(
                mut self,
                name: impl Into<String>,
                calculate: F,
            ) -> Result<Self, FieldTreeError>
            where
                F: Fn(&Value) -> Value + Send + Sync + 'static,
            {
                self.0
                    .add_calculator(name.into(), Calculator::Sync(Arc::new(calculate)))?;
                Ok(self)
            }

            /// Add a field computed asynchronously from this node's resolved result.
            pub fn calculated_async<F>(
                mut self,
                name: impl Into<String>,
                calculate: F,
            ) -> Result<Self, FieldTreeError>
            where
                F: for<'a> Fn(&'a Value) -> BoxFuture<'a, Result<Value, BoxError>>
                    + Send
                    + Sync
                    + 'static,
            {
                self.0
                    .add_calculator(name.into(), Calculator::Async(Arc::new(calculate)))?;
                Ok(self)
            }

            /// Replace this node's result with a derived value once it is resolved.
            pub fn transform<F>(mut self, transform: F) -> Self
            where
                F: Fn(Value) -> Value + Send + Sync + 'static,
            {
                self.0.set_transformer(Transformer::Sync(Arc::new(transform)));
                self
            }

            /// Like [`Self::transform`], with an asynchronous and fallible function.
            pub fn transform_async<F, Fut>(mut self, transform: F) -> Self
            where
                F: Fn(Value) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
            {
                self.0.set_transformer(Transformer::Async(Arc::new(move |value: Value| {
                    transform(value).boxed()
                })));
                self
            }
        }
    };
}

macro_rules! root_builder {
    ($builder:ident, $tag:expr, $kind:expr) => {
        impl $builder {
            pub fn new(name: impl Into<String>) -> Self {
                Self(FieldNode::new(name, $tag))
            }

            /// A root for which the server returns a list.
            pub fn list(name: impl Into<String>) -> Self {
                let mut node = FieldNode::new(name, $tag);
                node.set_list_result(true);
                Self(node)
            }

            /// Declare the GraphQL type of the result.
            pub fn of_type(mut self, result_type: impl Into<String>) -> Self {
                self.0.set_result_type(result_type.into());
                self
            }
        }

        impl IntoRoot for $builder {
            fn into_root(self) -> FieldNode {
                self.0
            }
        }

        impl Operation for $builder {
            fn kind(&self) -> OperationKind {
                $kind
            }

            fn roots(&self) -> Vec<&FieldNode> {
                vec![&self.0]
            }
        }

        selection_methods!($builder);
        computed_methods!($builder);
    };
}

/// The root of a query.
#[derive(Clone, Debug)]
pub struct Query(FieldNode);

root_builder!(Query, Tag::Query, OperationKind::Query);

/// The root of a mutation.
#[derive(Clone, Debug)]
pub struct Mutation(FieldNode);

root_builder!(Mutation, Tag::Mutation, OperationKind::Mutation);

/// A nested selection.
#[derive(Clone, Debug)]
pub struct Field(FieldNode);

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self(FieldNode::new(name, Tag::Field))
    }
}

selection_methods!(Field);
computed_methods!(Field);

/// Fields selected only when the parent resolves to `type_condition`.
#[derive(Clone, Debug)]
pub struct InlineFragment(FieldNode);

impl InlineFragment {
    pub fn on(type_condition: impl Into<String>) -> Self {
        Self(FieldNode::new(type_condition, Tag::InlineFragment))
    }

    pub fn type_condition(&self) -> &str {
        self.0.name()
    }
}

selection_methods!(InlineFragment);

impl IntoChild for Field {
    fn into_child(self) -> FieldNode {
        self.0
    }
}

impl IntoChild for InlineFragment {
    fn into_child(self) -> FieldNode {
        self.0
    }
}

impl IntoChild for &str {
    fn into_child(self) -> FieldNode {
        FieldNode::new(self, Tag::Field)
    }
}

impl IntoChild for String {
    fn into_child(self) -> FieldNode {
        FieldNode::new(self, Tag::Field)
    }
}

/// Independent roots sent together in a single request.
#[derive(Clone, Debug, Default)]
pub struct CombinedField {
    kind: Option<OperationKind>,
    roots: Vec<FieldNode>,
}

impl CombinedField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root.
    ///
    /// Roots must be of the same kind and have distinct names, since each one answers
    /// under its own top-level key.
    pub fn add(mut self, root: impl IntoRoot) -> Result<Self, FieldTreeError> {
        let root = root.into_root();
        let found = match root.tag() {
            Tag::Mutation => OperationKind::Mutation,
            _ => OperationKind::Query,
        };
        if let Some(expected) = self.kind {
            if expected != found {
                return Err(FieldTreeError::MixedOperations { expected, found });
            }
        }
        if self.roots.iter().any(|existing| existing.name() == root.name()) {
            return Err(FieldTreeError::DuplicateField {
                parent: found.to_string(),
                name: root.name().to_owned(),
            });
        }
        self.kind = Some(found);
        self.roots.push(root);
        Ok(self)
    }

    /// Registered roots in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldNode> {
        self.roots.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl Operation for CombinedField {
    fn kind(&self) -> OperationKind {
        self.kind.unwrap_or(OperationKind::Query)
    }

    fn roots(&self) -> Vec<&FieldNode> {
        self.roots.iter().collect()
    }
}

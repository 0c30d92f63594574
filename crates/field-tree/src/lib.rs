//! Declarative field trees for GraphQL requests.
//! Object model, builders and response post-processing.

/// Fluent builders for queries, mutations and nested fields
pub mod builder;

/// Error types for building trees and processing responses
pub mod error;

/// The field tree model
pub mod node;

/// Post-processing of responses against a field tree
pub mod processor;

/// Shapes implied by a field tree
pub mod shape;

/// Result values with seal tracking
pub mod value;

pub use builder::CombinedField;
pub use builder::Field;
pub use builder::InlineFragment;
pub use builder::IntoChild;
pub use builder::IntoRoot;
pub use builder::Mutation;
pub use builder::Operation;
pub use builder::Query;
pub use error::FieldTreeError;
pub use error::ProcessError;
pub use node::Argument;
pub use node::BoxError;
pub use node::FieldNode;
pub use node::OperationKind;
pub use node::Tag;
pub use processor::process;
pub use processor::process_response;
pub use shape::Shape;
pub use shape::ShapeError;
pub use value::Object;
pub use value::Seal;
pub use value::SealViolation;
pub use value::Value;

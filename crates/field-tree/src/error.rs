//! Field tree errors.
use displaydoc::Display;
use thiserror::Error;

use crate::node::OperationKind;
use crate::value::SealViolation;

/// Errors raised while assembling a field tree.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
pub enum FieldTreeError {
    /// field '{name}' is already declared on '{parent}'
    DuplicateField {
        /// The node the field was added to.
        parent: String,
        /// The colliding field name.
        name: String,
    },

    /// computed field '{name}' is already declared on '{parent}'
    DuplicateCalculator {
        /// The node the calculator was added to.
        parent: String,
        /// The colliding output name.
        name: String,
    },

    /// cannot combine a {found} with a {expected} in one request
    MixedOperations {
        /// The kind of the roots already registered.
        expected: OperationKind,
        /// The kind of the rejected root.
        found: OperationKind,
    },
}

/// Errors raised while processing a response against a field tree.
#[derive(Error, Display, Debug)]
pub enum ProcessError {
    /// result for '{field}' was already processed and sealed
    AlreadySealed {
        /// The node whose result was sealed.
        field: String,
    },

    /// {0}
    Seal(#[from] SealViolation),

    /// calculator '{name}' on '{field}' failed: {reason}
    Calculator {
        /// The node the calculator belongs to.
        field: String,
        /// The calculator's output name.
        name: String,
        /// The failure reason.
        reason: String,
    },

    /// transformer on '{field}' failed: {reason}
    Transformer {
        /// The node the transformer belongs to.
        field: String,
        /// The failure reason.
        reason: String,
    },
}

impl ProcessError {
    /// Whether this error reports a write against a sealed result.
    pub fn is_seal_violation(&self) -> bool {
        matches!(self, ProcessError::AlreadySealed { .. } | ProcessError::Seal(_))
    }
}

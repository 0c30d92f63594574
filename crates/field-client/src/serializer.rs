//! Writes field trees as GraphQL documents.
//!
//! The output is a single line with one selection block per root, in the order the
//! roots were given. Calculators and transformers are local and never sent.

use field_tree::Argument;
use field_tree::FieldNode;
use field_tree::OperationKind;
use field_tree::Tag;

use crate::Request;

/// Build the request for `roots`, sent as a single operation of `kind`.
pub fn prepare_request(roots: &[&FieldNode], kind: OperationKind) -> Request {
    let mut document = kind.to_string();
    document.push_str(" {");
    for root in roots {
        write_selection(&mut document, root);
    }
    document.push_str(" }");
    Request::builder().query(document).build()
}

fn write_selection(document: &mut String, node: &FieldNode) {
    match node.tag() {
        // nothing to select
        Tag::InlineFragment if node.is_leaf() => return,
        Tag::InlineFragment => {
            document.push_str(" ... on ");
            document.push_str(node.name());
        }
        Tag::Field | Tag::Query | Tag::Mutation => {
            document.push(' ');
            document.push_str(node.name());
            write_arguments(document, node);
        }
    }

    if !node.is_leaf() {
        document.push_str(" {");
        for child in node.children() {
            write_selection(document, child);
        }
        document.push_str(" }");
    }
}

fn write_arguments(document: &mut String, node: &FieldNode) {
    let mut arguments = node.arguments().peekable();
    if arguments.peek().is_none() {
        return;
    }
    document.push('(');
    for (index, (name, argument)) in arguments.enumerate() {
        if index > 0 {
            document.push_str(", ");
        }
        document.push_str(name);
        document.push_str(": ");
        match argument {
            Argument::Enum(value) => document.push_str(value),
            Argument::Literal(value) => write_literal(document, value),
        }
    }
    document.push(')');
}

fn write_literal(document: &mut String, value: &serde_json::Value) {
    match value {
        serde_json::Value::Array(items) => {
            document.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    document.push_str(", ");
                }
                write_literal(document, item);
            }
            document.push(']');
        }
        serde_json::Value::Object(fields) => {
            document.push('{');
            for (index, (name, item)) in fields.iter().enumerate() {
                if index > 0 {
                    document.push_str(", ");
                }
                document.push_str(name);
                document.push_str(": ");
                write_literal(document, item);
            }
            document.push('}');
        }
        // json scalars are valid graphql literals
        scalar => document.push_str(&scalar.to_string()),
    }
}

//! Posts field trees to a GraphQL endpoint and shapes the responses

/// The client and its registered operations.
pub mod client;

/// Response payload validation.
pub mod parser;

/// Field tree to request document.
pub mod serializer;

/// Sending requests over http.
pub mod transport;

use std::fmt;

use displaydoc::Display;
use field_tree::FieldTreeError;
use field_tree::OperationKind;
use field_tree::ProcessError;
use field_tree::ShapeError;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

pub use client::Client;
pub use configuration::Configuration;
pub use configuration::ConfigurationOverrides;
pub use parser::parse_response;
pub use serializer::prepare_request;
pub use transport::HttpTransport;
pub use transport::Transport;

/// A json object
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// A path for an error. This can be composed of strings and numbers
pub type Path = Vec<PathElement>;

/// Transport errors.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
pub enum FetchError {
    /// invalid endpoint '{endpoint}': {reason}
    InvalidEndpoint {
        /// The configured endpoint.
        endpoint: String,
        /// Why it could not be used.
        reason: String,
    },

    /// invalid header '{name}': {reason}
    InvalidHeader {
        /// The header name.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// HTTP fetch failed: {reason}
    HttpError {
        /// The response status, if a response was received.
        status: Option<u16>,
        /// The failure reason.
        reason: String,
    },

    /// malformed response: {reason}
    MalformedResponse {
        /// The failure reason.
        reason: String,
    },
}

/// Errors returned to callers of the [`Client`].
#[derive(Error, Display, Debug)]
pub enum ClientError {
    /// attempted to post a request without any field
    EmptyRequest,

    /// the server reported errors: {errors}
    ServerReported {
        /// The errors, in the order the server listed them.
        errors: ServerErrors,
    },

    /// no {kind} registered under '{name}'
    UnknownOperation {
        /// Whether a query or a mutation was requested.
        kind: OperationKind,
        /// The requested name.
        name: String,
    },

    /// {0}
    Fetch(#[from] FetchError),

    /// could not build the request: {0}
    Build(#[from] FieldTreeError),

    /// {0}
    Process(#[from] ProcessError),

    /// response does not match the request: {0}
    Shape(#[from] ShapeError),
}

/// A GraphQL path element that is composes of strings or numbers.
/// e.g `/book/3/name`
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An integer path element.
    Number(i64),

    /// A string path element.
    String(String),
}

/// A graphql request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[builder(setter(into))]
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub operation_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub variables: Option<JsonObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub extensions: Option<JsonObject>,
}

/// A GraphQL error.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonObject>,
}

impl GraphQLError {
    /// An error carrying only a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A location in a file in a graphql error.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Errors reported by the server for one request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServerErrors(Vec<GraphQLError>);

impl ServerErrors {
    pub fn iter(&self) -> impl Iterator<Item = &GraphQLError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<GraphQLError> {
        self.0
    }
}

impl From<Vec<GraphQLError>> for ServerErrors {
    fn from(errors: Vec<GraphQLError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ServerErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

//! Validates response payloads.
//!
//! Servers are lenient in how they report errors, so `errors` is accepted as
//! a single message, a single error object, or a list mixing both.

use crate::ClientError;
use crate::FetchError;
use crate::GraphQLError;

/// Return the `data` of `payload`, or the errors the server reported.
///
/// An absent `data` member is returned as null.
pub fn parse_response(payload: serde_json::Value) -> Result<serde_json::Value, ClientError> {
    let mut payload = match payload {
        serde_json::Value::Object(payload) => payload,
        other => {
            return Err(FetchError::MalformedResponse {
                reason: format!("expected a JSON object, found {other}"),
            }
            .into())
        }
    };

    if let Some(errors) = payload.remove("errors") {
        let errors = normalize_errors(errors)?;
        if !errors.is_empty() {
            tracing::debug!(count = errors.len(), "server reported errors");
            return Err(ClientError::ServerReported {
                errors: errors.into(),
            });
        }
    }

    Ok(payload.remove("data").unwrap_or_default())
}

fn normalize_errors(errors: serde_json::Value) -> Result<Vec<GraphQLError>, FetchError> {
    match errors {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::String(message) if message.is_empty() => Ok(Vec::new()),
        serde_json::Value::Array(items) => items.into_iter().map(to_error).collect(),
        error @ (serde_json::Value::String(_) | serde_json::Value::Object(_)) => {
            Ok(vec![to_error(error)?])
        }
        other => Err(FetchError::MalformedResponse {
            reason: format!("unexpected errors member {other}"),
        }),
    }
}

fn to_error(error: serde_json::Value) -> Result<GraphQLError, FetchError> {
    match error {
        serde_json::Value::String(message) => Ok(GraphQLError::from_message(message)),
        other => serde_json::from_value(other).map_err(|err| FetchError::MalformedResponse {
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::Location;

    fn server_errors(payload: serde_json::Value) -> Vec<GraphQLError> {
        match parse_response(payload) {
            Err(ClientError::ServerReported { errors }) => errors.into_inner(),
            other => panic!("expected server errors, got {other:?}"),
        }
    }

    #[test]
    fn data_is_returned_unchanged() {
        let data = json!({ "person": { "name": "A", "friends": [1, 2] } });
        assert_eq!(
            parse_response(json!({ "data": data.clone() })).unwrap(),
            data
        );
    }

    #[test]
    fn empty_or_null_errors_are_ignored() {
        let data = json!({ "car": null });
        for errors in [json!([]), json!(null), json!("")] {
            assert_eq!(
                parse_response(json!({ "data": data.clone(), "errors": errors })).unwrap(),
                data
            );
        }
    }

    #[test]
    fn missing_data_is_null() {
        assert_eq!(parse_response(json!({})).unwrap(), json!(null));
    }

    #[test]
    fn error_list() {
        let errors = server_errors(json!({
            "data": null,
            "errors": [{
                "message": "Cannot query field \"age\" on type \"Person\".",
                "locations": [{ "line": 1, "column": 18 }]
            }]
        }));
        assert_eq!(
            errors,
            vec![GraphQLError {
                message: "Cannot query field \"age\" on type \"Person\".".to_owned(),
                locations: vec![Location { line: 1, column: 18 }],
                path: None,
                extensions: None,
            }]
        );
    }

    #[test]
    fn single_message() {
        assert_eq!(
            server_errors(json!({ "errors": "not authorized" })),
            vec![GraphQLError::from_message("not authorized")]
        );
    }

    #[test]
    fn single_object_and_mixed_lists() {
        assert_eq!(
            server_errors(json!({ "errors": { "message": "boom" } })),
            vec![GraphQLError::from_message("boom")]
        );
        assert_eq!(
            server_errors(json!({ "errors": ["first", { "message": "second" }] })),
            vec![
                GraphQLError::from_message("first"),
                GraphQLError::from_message("second")
            ]
        );
    }

    #[test]
    fn malformed_payloads() {
        assert!(matches!(
            parse_response(json!([1, 2])),
            Err(ClientError::Fetch(FetchError::MalformedResponse { .. }))
        ));
        assert!(matches!(
            parse_response(json!({ "errors": [{ "code": 3 }] })),
            Err(ClientError::Fetch(FetchError::MalformedResponse { .. }))
        ));
        assert!(matches!(
            parse_response(json!({ "errors": 3 })),
            Err(ClientError::Fetch(FetchError::MalformedResponse { .. }))
        ));
    }
}

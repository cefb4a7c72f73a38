//! GraphQL requests and responses as they travel over HTTP

use std::collections::HashMap;

use apollo_compiler::response::GraphQLError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GraphQL request, as sent in a POST body or GET query string
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The GraphQL document
    pub query: String,

    /// Variable values for the selected operation
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,

    /// Name of the operation to execute, required when the document has more than one
    #[serde(default)]
    pub operation_name: Option<String>,

    /// Protocol extensions. Accepted and ignored.
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    /// Build a request from GET query parameters.
    ///
    /// `variables` and `extensions` are JSON encoded, as in the URL form of
    /// the GraphQL-over-HTTP convention.
    pub fn from_query_params(mut params: HashMap<String, String>) -> Result<Self, Error> {
        let query = params
            .remove("query")
            .filter(|query| !query.trim().is_empty())
            .ok_or_else(|| Error::new("Must provide query string."))?;

        let variables = params
            .remove("variables")
            .map(|variables| {
                serde_json::from_str::<Option<Map<String, Value>>>(&variables)
                    .map_err(|_| Error::new("Variables are invalid JSON."))
            })
            .transpose()?
            .flatten();

        let extensions = params
            .remove("extensions")
            .map(|extensions| {
                serde_json::from_str::<Option<Map<String, Value>>>(&extensions)
                    .map_err(|_| Error::new("Extensions are invalid JSON."))
            })
            .transpose()?
            .flatten();

        Ok(Self {
            query,
            variables,
            operation_name: params.remove("operationName"),
            extensions,
        })
    }

    /// Parse a POST body
    pub fn from_body(body: &[u8]) -> Result<Self, Error> {
        let request: Request = serde_json::from_slice(body)
            .map_err(|error| Error::new(format!("POST body is not a valid GraphQL request: {error}")))?;
        if request.query.trim().is_empty() {
            return Err(Error::new("Must provide query string."));
        }
        Ok(request)
    }
}

/// A location in the GraphQL document an error refers to
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// An entry of the response `errors` array
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Error {
    pub message: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
        }
    }
}

impl From<GraphQLError> for Error {
    fn from(error: GraphQLError) -> Self {
        Self {
            locations: error
                .locations
                .iter()
                .map(|location| Location {
                    line: location.line,
                    column: location.column,
                })
                .collect(),
            message: error.message,
        }
    }
}

/// A GraphQL response
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Response {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Error>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    /// A response to a request that could not be executed at all
    pub fn from_errors(errors: impl IntoIterator<Item = Error>) -> Self {
        Self {
            errors: errors.into_iter().collect(),
            data: None,
        }
    }

    /// True when execution never started, so there is no `data` entry
    pub fn is_request_error(&self) -> bool {
        self.data.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_a_post_body() {
        let request = Request::from_body(
            br#"{"query": "query Q($id: ID) { node(id: $id) { id } }", "variables": {"id": "1"}, "operationName": "Q"}"#,
        )
        .unwrap();

        assert_eq!(
            request,
            Request::new("query Q($id: ID) { node(id: $id) { id } }")
                .with_variables(json!({"id": "1"}).as_object().unwrap().clone())
                .with_operation_name("Q")
        );
    }

    #[test]
    fn null_variables_are_absent() {
        let request = Request::from_body(br#"{"query": "{ id }", "variables": null}"#).unwrap();

        assert_eq!(request.variables, None);
    }

    #[test]
    fn missing_query_is_rejected() {
        assert!(Request::from_body(br#"{"variables": {}}"#).is_err());
        assert_eq!(
            Request::from_body(br#"{"query": "  "}"#).unwrap_err(),
            Error::new("Must provide query string.")
        );
    }

    #[test]
    fn non_json_body_is_rejected() {
        let error = Request::from_body(b"query { id }").unwrap_err();

        assert!(error.message.starts_with("POST body is not a valid GraphQL request"));
    }

    #[test]
    fn parses_query_params() {
        let params = HashMap::from([
            ("query".to_string(), "{ id }".to_string()),
            ("variables".to_string(), r#"{"first": 2}"#.to_string()),
            ("operationName".to_string(), "Op".to_string()),
        ]);

        let request = Request::from_query_params(params).unwrap();

        assert_eq!(request.query, "{ id }");
        assert_eq!(request.variables, json!({"first": 2}).as_object().cloned());
        assert_eq!(request.operation_name.as_deref(), Some("Op"));
    }

    #[test]
    fn invalid_variables_param_is_rejected() {
        let params = HashMap::from([
            ("query".to_string(), "{ id }".to_string()),
            ("variables".to_string(), "{".to_string()),
        ]);

        assert_eq!(
            Request::from_query_params(params).unwrap_err(),
            Error::new("Variables are invalid JSON.")
        );
    }

    #[test]
    fn serializes_errors_without_empty_locations() {
        let response = Response::from_errors([Error::new("boom")]);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"errors": [{"message": "boom"}]})
        );
        assert!(response.is_request_error());
    }
}

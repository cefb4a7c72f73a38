//! Schemas whose every field answers with generated data
//!
//! A [`MockedSchema`] is built once from a schema definition document. It has
//! no resolvers: each selected field gets a value shaped like its declared
//! type. Scalars get representative dummy values, lists a fixed number of
//! items, objects recurse into their selections, and abstract types pick one
//! of their concrete object types.

mod executor;
mod scalars;
mod store;
mod values;

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use apollo_compiler::{
    ExecutableDocument, Name, Node, Schema,
    ast::{Document, OperationType},
    collections::HashMap as ImplementersMap,
    executable::Operation,
    introspection,
    request::coerce_variable_values,
    response::JsonMap,
    schema::{ExtendedType, Implementers},
    validation::Valid,
};
use bon::Builder;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Map, Value};
use tracing::debug;

pub use scalars::ScalarMocks;

use crate::{
    errors::ServerError,
    graphql::{Error, Request, Response},
};
use executor::{Executor, MockState};
use store::MockStore;

/// Number of items generated for list fields unless configured otherwise
pub const DEFAULT_LIST_LENGTH: usize = 2;

/// Path reported for operations in error locations
const REQUEST_SOURCE_PATH: &str = "request.graphql";

/// How mock values are generated
#[derive(Debug, Clone, Builder)]
pub struct MockOptions {
    /// Seed for the random generator. Seeded servers answer the same sequence
    /// of requests with the same data.
    pub seed: Option<u64>,

    /// Number of items in every mocked list
    #[builder(default = DEFAULT_LIST_LENGTH)]
    pub list_length: usize,

    /// Fixed values for scalars
    #[builder(default)]
    pub scalar_mocks: ScalarMocks,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            seed: None,
            list_length: DEFAULT_LIST_LENGTH,
            scalar_mocks: ScalarMocks::default(),
        }
    }
}

/// A request that parsed, validated, and had its variables coerced
#[derive(Debug)]
pub struct PreparedRequest {
    document: Valid<ExecutableDocument>,
    operation: Node<Operation>,
    variables: Valid<JsonMap>,
    variables_json: Map<String, Value>,
}

impl PreparedRequest {
    pub fn operation_type(&self) -> OperationType {
        self.operation.operation_type
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation.name.as_ref().map(Name::as_str)
    }
}

/// An executable schema answering every field with mock data
pub struct MockedSchema {
    schema: Valid<Schema>,
    implementers: ImplementersMap<Name, Implementers>,
    possible_types: HashMap<Name, Vec<Name>>,
    options: MockOptions,
    state: Mutex<MockState>,
}

impl MockedSchema {
    /// Build the executable schema for `document` and attach mocks to it
    pub fn new(document: &Document, options: MockOptions) -> Result<Self, ServerError> {
        let schema = document
            .to_schema_validate()
            .map_err(|errors| ServerError::SchemaInvalid(Box::new(errors)))?;
        Ok(Self::from_schema(schema, options))
    }

    pub fn from_schema(schema: Valid<Schema>, options: MockOptions) -> Self {
        let implementers = schema.implementers_map();
        let possible_types = possible_types(&schema, &implementers);
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        debug!(
            types = schema.types.len(),
            abstract_types = possible_types.len(),
            seed = ?options.seed,
            list_length = options.list_length,
            "Mocked schema"
        );

        Self {
            schema,
            implementers,
            possible_types,
            options,
            state: Mutex::new(MockState {
                store: MockStore::default(),
                rng,
            }),
        }
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    /// Parse and validate a request, select its operation, and coerce its variables.
    ///
    /// Failures come back as a ready-to-send response without `data`.
    pub fn prepare(&self, request: &Request) -> Result<PreparedRequest, Response> {
        let document = ExecutableDocument::parse_and_validate(
            &self.schema,
            request.query.as_str(),
            REQUEST_SOURCE_PATH,
        )
        .map_err(|errors| {
            Response::from_errors(
                errors
                    .errors
                    .iter()
                    .map(|diagnostic| Error::from(diagnostic.to_json())),
            )
        })?;

        let operation = document
            .operations
            .get(request.operation_name.as_deref())
            .map_err(|_| {
                Response::from_errors([Error::new(match &request.operation_name {
                    Some(name) => format!("Unknown operation named \"{name}\"."),
                    None => {
                        "Must provide operation name if query contains multiple operations."
                            .to_string()
                    }
                })])
            })?
            .clone();

        if operation.operation_type == OperationType::Subscription {
            return Err(Response::from_errors([Error::new(
                "Subscriptions are not supported by the mock server.",
            )]));
        }

        let raw_variables: JsonMap = serde_json::from_value(Value::Object(
            request.variables.clone().unwrap_or_default(),
        ))
        .map_err(|_| Response::from_errors([Error::new("Variables are invalid JSON.")]))?;
        let variables = coerce_variable_values(&self.schema, &operation, &raw_variables)
            .map_err(|error| {
                Response::from_errors([Error::from(error.to_graphql_error(&document.sources))])
            })?;
        let variables_json = serde_json::to_value(&*variables)
            .ok()
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();

        Ok(PreparedRequest {
            document,
            operation,
            variables,
            variables_json,
        })
    }

    /// Execute a prepared request against the mocks
    pub fn execute_prepared(&self, prepared: &PreparedRequest) -> Response {
        let operation = &prepared.operation;
        let Some(root_type) = self.schema.root_operation(operation.operation_type) else {
            return Response::from_errors([Error::new(format!(
                "Schema is not configured to execute {:?} operations.",
                operation.operation_type
            ))]);
        };

        let mut errors = Vec::new();
        let introspection = if operation.operation_type == OperationType::Query {
            self.introspect(prepared, &mut errors)
        } else {
            Map::new()
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut executor = Executor {
            schema: &self.schema,
            document: &prepared.document,
            possible_types: &self.possible_types,
            options: &self.options,
            variables: &prepared.variables_json,
            state: &mut state,
            errors: Vec::new(),
        };
        let data = executor.execute_root(root_type, &operation.selection_set, &introspection);
        errors.append(&mut executor.errors);
        debug!(
            operation = prepared.operation_name().unwrap_or("<anonymous>"),
            stored_objects = state.store.len(),
            "Executed mocked operation"
        );

        Response {
            errors,
            data: Some(Value::Object(data)),
        }
    }

    /// Prepare and execute in one go
    pub fn execute(&self, request: &Request) -> Response {
        match self.prepare(request) {
            Ok(prepared) => self.execute_prepared(&prepared),
            Err(response) => response,
        }
    }

    /// Answer the introspection root fields of a query operation
    fn introspect(&self, prepared: &PreparedRequest, errors: &mut Vec<Error>) -> Map<String, Value> {
        match introspection::partial_execute(
            &self.schema,
            &self.implementers,
            &prepared.document,
            &prepared.operation,
            &prepared.variables,
        ) {
            Ok(response) => {
                errors.extend(response.errors.into_iter().map(Error::from));
                response
                    .data
                    .and_then(|data| serde_json::to_value(&data).ok())
                    .and_then(|value| match value {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .unwrap_or_default()
            }
            Err(error) => {
                errors.push(Error::from(
                    error.to_graphql_error(&prepared.document.sources),
                ));
                Map::new()
            }
        }
    }
}

/// Concrete object types for every interface and union, sorted by name so
/// seeded runs pick the same ones
fn possible_types(
    schema: &Schema,
    implementers: &ImplementersMap<Name, Implementers>,
) -> HashMap<Name, Vec<Name>> {
    schema
        .types
        .iter()
        .filter_map(|(name, ty)| {
            let mut objects: Vec<Name> = match ty {
                ExtendedType::Interface(_) => implementers
                    .get(name)
                    .map(|implementers| implementers.objects.iter().cloned().collect())
                    .unwrap_or_default(),
                ExtendedType::Union(union_type) => union_type
                    .members
                    .iter()
                    .map(|member| member.name.clone())
                    .collect(),
                _ => return None,
            };
            objects.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Some((name.clone(), objects))
        })
        .collect()
}

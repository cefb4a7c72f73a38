//! Loading GraphQL schema definitions from disk

use std::path::Path;

use apollo_compiler::{ast::Document, parser::Parser};
use tracing::debug;

use crate::errors::ServerError;

/// Read and parse the schema definition document at `path`.
///
/// The file is read exactly once. Only syntax is checked here; building and
/// validating the schema happens when it is mocked.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Document, ServerError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading schema");
    let sdl = std::fs::read_to_string(path).map_err(|source| ServerError::SchemaRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_schema(sdl, path)
}

/// Parse schema definition language text into a type-definition document
pub fn parse_schema(sdl: impl Into<String>, path: impl AsRef<Path>) -> Result<Document, ServerError> {
    Parser::new()
        .parse_ast(sdl, path)
        .map_err(|errors| ServerError::SchemaParse(Box::new(errors)))
}

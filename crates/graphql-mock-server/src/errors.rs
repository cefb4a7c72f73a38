use std::{net::SocketAddr, path::PathBuf};

use apollo_compiler::{Schema, ast::Document, validation::WithErrors};

/// An error in server initialization
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Could not read GraphQL schema from {}: {source}", path.display())]
    SchemaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse GraphQL schema: {0}")]
    SchemaParse(Box<WithErrors<Document>>),

    #[error("Invalid GraphQL schema: {0}")]
    SchemaInvalid(Box<WithErrors<Schema>>),

    #[error("Could not read scalar mocks from {}: {source}", path.display())]
    ScalarMocksRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scalar mocks: {0}")]
    ScalarMocks(serde_json::Error),

    #[error("invalid CORS configuration: {0}")]
    Cors(String),

    #[error("Could not bind to {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server failed: {0}")]
    Serve(#[source] std::io::Error),
}

use std::{net::IpAddr, path::PathBuf};

use graphql_mock_server::{
    cors::CorsConfig,
    health::HealthCheckConfig,
    server::{DEFAULT_ADDRESS, DEFAULT_PATH, DEFAULT_PORT},
};
use schemars::JsonSchema;
use serde::Deserialize;

use super::{logging::Logging, mocks::Mocks};

/// Configuration for the GraphQL mock server
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Path to the GraphQL schema definition to mock
    pub schema: PathBuf,

    /// The IP address to bind to
    pub address: IpAddr,

    /// The port to listen on
    pub port: u16,

    /// The HTTP path of the GraphQL endpoint
    pub path: String,

    /// Serve GraphiQL to browsers on the GraphQL path
    pub graphiql: bool,

    /// How mock values are generated
    pub mocks: Mocks,

    /// CORS configuration
    pub cors: CorsConfig,

    /// Health check configuration
    pub health_check: HealthCheckConfig,

    /// Logging configuration
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: PathBuf::from("schema.graphql"),
            address: DEFAULT_ADDRESS,
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            graphiql: true,
            mocks: Mocks::default(),
            cors: CorsConfig::default(),
            health_check: HealthCheckConfig::default(),
            logging: Logging::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn it_parses_a_minimal_config() {
        let config = serde_json::from_str::<Config>("{}").unwrap();

        assert_eq!(config.schema, PathBuf::from("schema.graphql"));
        assert_eq!(config.address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.port, 4000);
        assert_eq!(config.path, "/graphql");
        assert!(config.graphiql);
        assert!(config.cors.enabled);
        assert!(config.health_check.enabled);
        assert_eq!(config.mocks.list_length, 2);
    }

    #[test]
    fn it_rejects_unknown_nested_keys() {
        let result = serde_json::from_str::<Config>(r#"{"mocks": {"sead": 1}}"#);

        assert!(result.is_err());
    }

    #[test]
    fn it_contains_no_keys_with_double_underscore() {
        // Env overrides split nested keys on `__`, see [runtime::read_config]
        let schema = schemars::schema_for!(Config).to_value().to_string();

        assert!(!schema.contains("__"))
    }
}

//! Runtime utilites
//!
//! This module is only used by the binaries and provides helper code
//! related to runtime configuration.

mod config;
mod logging;
mod mocks;

use std::path::Path;

pub use config::Config;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};

/// Prefix of environment variables overriding configuration
const ENV_PREFIX: &str = "GRAPHQL_MOCK_";

/// Separator to use when drilling down into nested options in the env figment
const ENV_NESTED_SEPARATOR: &str = "__";

/// Read configuration from environment variables only (when no config file is provided)
#[allow(clippy::result_large_err)]
pub fn read_config_from_env() -> Result<Config, figment::Error> {
    Figment::new()
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .extract()
}

/// Read in a config from a YAML file, filling in any missing values from the environment
#[allow(clippy::result_large_err)]
pub fn read_config(yaml_path: impl AsRef<Path>) -> Result<Config, figment::Error> {
    Figment::new()
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .join(Yaml::file(yaml_path))
        .extract()
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::{read_config, read_config_from_env};

    #[test]
    fn it_prioritizes_env_vars() {
        let config = r#"
            port: 5000
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("GRAPHQL_MOCK_PORT", "6000");

            let config = read_config(path)?;

            assert_eq!(config.port, 6000);
            Ok(())
        });
    }

    #[test]
    fn it_extracts_nested_env() {
        let config = r#"
            mocks:
                list_length: 3
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("GRAPHQL_MOCK_MOCKS__SEED", "42");

            let config = read_config(path)?;

            assert_eq!(config.mocks.seed, Some(42));
            assert_eq!(config.mocks.list_length, 3);
            Ok(())
        });
    }

    #[test]
    fn it_merges_env_and_file() {
        let config = "
            schema: api/schema.graphql
            path: /api
            cors:
                allow_any_origin: false
                origins:
                    - http://localhost:3000
        ";

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("GRAPHQL_MOCK_HEALTH_CHECK__ENABLED", "false");

            let config = read_config(path)?;

            assert_eq!(config.schema, PathBuf::from("api/schema.graphql"));
            assert_eq!(config.path, "/api");
            assert_eq!(config.port, 4000);
            assert!(!config.cors.allow_any_origin);
            assert_eq!(config.cors.origins, ["http://localhost:3000"]);
            assert!(!config.health_check.enabled);
            Ok(())
        });
    }

    #[test]
    fn it_reads_env_without_a_file() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GRAPHQL_MOCK_SCHEMA", "other.graphql");
            jail.set_env("GRAPHQL_MOCK_LOGGING__LEVEL", "debug");

            let config = read_config_from_env()?;

            assert_eq!(config.schema, PathBuf::from("other.graphql"));
            assert_eq!(config.logging.level, tracing::Level::DEBUG);
            Ok(())
        });
    }

    #[test]
    fn it_reports_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: not-a-port")?;

            assert!(read_config("config.yaml").is_err());
            Ok(())
        });
    }
}

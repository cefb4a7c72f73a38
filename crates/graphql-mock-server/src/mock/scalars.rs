use std::{collections::HashMap, path::PathBuf, str::FromStr};

use serde_json::Value;

use crate::errors::ServerError;

/// Fixed mock values for scalars, keyed by scalar name.
///
/// Loaded from a JSON object such as `{"DateTime": "2024-01-01T00:00:00Z"}`.
/// Entries for built-in scalars override the random defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarMocks(HashMap<String, Value>);

impl ScalarMocks {
    pub fn get(&self, scalar: &str) -> Option<&Value> {
        self.0.get(scalar)
    }

    pub fn insert(&mut self, scalar: impl Into<String>, value: Value) {
        self.0.insert(scalar.into(), value);
    }
}

impl FromStr for ScalarMocks {
    type Err = ServerError;

    fn from_str(scalar_mocks_file: &str) -> Result<Self, Self::Err> {
        let parsed: serde_json::Map<String, Value> =
            serde_json::from_str(scalar_mocks_file).map_err(ServerError::ScalarMocks)?;

        Ok(ScalarMocks(parsed.into_iter().collect()))
    }
}

impl TryFrom<&PathBuf> for ScalarMocks {
    type Error = ServerError;

    fn try_from(path: &PathBuf) -> Result<Self, Self::Error> {
        tracing::debug!(scalar_mocks=?path, "Loading scalar mocks");
        let contents =
            std::fs::read_to_string(path).map_err(|source| ServerError::ScalarMocksRead {
                path: path.clone(),
                source,
            })?;
        ScalarMocks::from_str(contents.as_str())
    }
}

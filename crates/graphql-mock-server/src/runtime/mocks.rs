use std::path::PathBuf;

use graphql_mock_server::{
    errors::ServerError,
    mock::{DEFAULT_LIST_LENGTH, MockOptions, ScalarMocks},
};
use schemars::JsonSchema;
use serde::Deserialize;

/// Mock value generation options
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Mocks {
    /// Seed for the random generator. Set it to get the same data on every run.
    pub seed: Option<u64>,

    /// Number of items in every mocked list
    pub list_length: usize,

    /// Path to a JSON object of fixed values keyed by scalar name
    pub scalars: Option<PathBuf>,
}

impl Default for Mocks {
    fn default() -> Self {
        Self {
            seed: None,
            list_length: DEFAULT_LIST_LENGTH,
            scalars: None,
        }
    }
}

impl Mocks {
    /// Resolve into the options of a mocked schema, reading scalar mocks if configured
    pub fn options(&self) -> Result<MockOptions, ServerError> {
        let scalar_mocks = self
            .scalars
            .as_ref()
            .map(|path| ScalarMocks::try_from(path))
            .transpose()?
            .unwrap_or_default();

        Ok(MockOptions::builder()
            .maybe_seed(self.seed)
            .list_length(self.list_length)
            .scalar_mocks(scalar_mocks)
            .build())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults() {
        let options = Mocks::default().options().unwrap();

        assert_eq!(options.seed, None);
        assert_eq!(options.list_length, DEFAULT_LIST_LENGTH);
        assert_eq!(options.scalar_mocks, ScalarMocks::default());
    }

    #[test]
    fn reads_scalar_mocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalars.json");
        std::fs::write(&path, r#"{"DateTime": "2024-01-01T00:00:00Z"}"#).unwrap();
        let mocks = Mocks {
            seed: Some(1),
            list_length: 5,
            scalars: Some(path),
        };

        let options = mocks.options().unwrap();

        assert_eq!(options.seed, Some(1));
        assert_eq!(options.list_length, 5);
        assert_eq!(
            options.scalar_mocks.get("DateTime"),
            Some(&json!("2024-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn missing_scalar_mocks_file() {
        let mocks = Mocks {
            scalars: Some(PathBuf::from("does/not/exist.json")),
            ..Default::default()
        };

        assert!(matches!(
            mocks.options(),
            Err(ServerError::ScalarMocksRead { .. })
        ));
    }
}

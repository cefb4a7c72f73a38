//! Cross Origin Resource Sharing for the GraphQL endpoint
//!
//! Mock servers are mostly called from front-end dev servers on another
//! port, so CORS is on by default and allows any origin. Set `allow_any_origin`
//! to false and list `origins` to lock it down.

use std::time::Duration;

use http::{HeaderName, HeaderValue, Method};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

use crate::errors::ServerError;

/// Cross origin request configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS support
    pub enabled: bool,

    /// Answer any origin with `Access-Control-Allow-Origin: *`. Defaults to true.
    pub allow_any_origin: bool,

    /// Set to true to add the `Access-Control-Allow-Credentials` header
    pub allow_credentials: bool,

    /// The headers to allow.
    /// When empty, the client's `Access-Control-Request-Headers` are mirrored.
    pub allow_headers: Vec<String>,

    /// Response headers made available to scripts running in the browser
    pub expose_headers: Vec<String>,

    /// Allowed request methods
    pub methods: Vec<String>,

    /// The `Access-Control-Max-Age` header value in time units
    #[serde(deserialize_with = "humantime_serde::deserialize", default)]
    #[serde(serialize_with = "humantime_serde::serialize")]
    #[schemars(with = "Option<String>", default)]
    pub max_age: Option<Duration>,

    /// The origins to allow requests from when `allow_any_origin` is false
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_any_origin: true,
            allow_credentials: false,
            allow_headers: Vec::new(),
            expose_headers: Vec::new(),
            methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            max_age: None,
            origins: Vec::new(),
        }
    }
}

impl CorsConfig {
    /// Build the tower layer for this configuration
    pub fn into_layer(self) -> Result<CorsLayer, ServerError> {
        self.validate()?;

        let mut cors = CorsLayer::new();

        if self.allow_any_origin {
            cors = cors.allow_origin(AllowOrigin::any());
        } else if !self.origins.is_empty() {
            let origins = parse_all(&self.origins, |origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| format!("origin '{origin}' is not a valid header value"))
            })?;
            cors = cors.allow_origin(origins);
        }

        if !self.methods.is_empty() {
            let methods = parse_all(&self.methods, |method| {
                Method::from_bytes(method.as_bytes())
                    .map_err(|_| format!("method '{method}' is not a valid HTTP method"))
            })?;
            cors = cors.allow_methods(AllowMethods::list(methods));
        }

        if self.allow_headers.is_empty() {
            cors = cors.allow_headers(AllowHeaders::mirror_request());
        } else {
            cors = cors.allow_headers(parse_all(&self.allow_headers, |header| {
                parse_header_name("allow", header)
            })?);
        }

        if !self.expose_headers.is_empty() {
            let headers = parse_all(&self.expose_headers, |header| {
                parse_header_name("expose", header)
            })?;
            cors = cors.expose_headers(ExposeHeaders::list(headers));
        }

        if self.allow_credentials {
            cors = cors.allow_credentials(true);
        }

        if let Some(max_age) = self.max_age {
            cors = cors.max_age(max_age);
        }

        Ok(cors)
    }

    /// Reject combinations browsers refuse to honour
    fn validate(&self) -> Result<(), ServerError> {
        if self.origins.iter().any(|origin| origin == "*") {
            return Err(ServerError::Cors(
                "use `allow_any_origin: true` to set `Access-Control-Allow-Origin: *`".to_string(),
            ));
        }

        if self
            .origins
            .iter()
            .any(|origin| origin.ends_with('/') && origin != "/")
        {
            return Err(ServerError::Cors(
                "origins cannot have trailing slashes".to_string(),
            ));
        }

        if self.allow_credentials {
            let wildcard = if self.allow_any_origin {
                Some("`allow_any_origin: true`")
            } else if self.allow_headers.iter().any(|header| header == "*") {
                Some("wildcard in `allow_headers`")
            } else if self.methods.iter().any(|method| method == "*") {
                Some("wildcard in `methods`")
            } else if self.expose_headers.iter().any(|header| header == "*") {
                Some("wildcard in `expose_headers`")
            } else {
                None
            };
            if let Some(wildcard) = wildcard {
                return Err(ServerError::Cors(format!(
                    "cannot combine `allow_credentials: true` with {wildcard}"
                )));
            }
        }

        Ok(())
    }
}

fn parse_all<T>(
    values: &[String],
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Vec<T>, ServerError> {
    values
        .iter()
        .map(|value| parse(value).map_err(ServerError::Cors))
        .collect()
}

fn parse_header_name(kind: &str, header: &str) -> Result<HeaderName, String> {
    HeaderName::from_bytes(header.as_bytes())
        .map_err(|_| format!("{kind} header name '{header}' is not a valid HTTP header name"))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_allow_any_origin() {
        let config = CorsConfig::default();

        assert!(config.enabled);
        assert!(config.allow_any_origin);
        assert!(!config.allow_credentials);
        assert!(config.origins.is_empty());
        assert_eq!(config.methods, ["GET", "POST", "OPTIONS"]);
        assert!(config.into_layer().is_ok());
    }

    #[test]
    fn explicit_origins() {
        let config = CorsConfig {
            allow_any_origin: false,
            allow_credentials: true,
            allow_headers: vec!["content-type".into()],
            expose_headers: vec!["x-request-id".into()],
            max_age: Some(Duration::from_secs(600)),
            origins: vec!["http://localhost:3000".into()],
            ..Default::default()
        };

        assert!(config.into_layer().is_ok());
    }

    #[rstest]
    #[case::wildcard_origin(
        CorsConfig { allow_any_origin: false, origins: vec!["*".into()], ..Default::default() },
        "use `allow_any_origin: true`"
    )]
    #[case::trailing_slash(
        CorsConfig { allow_any_origin: false, origins: vec!["http://localhost:3000/".into()], ..Default::default() },
        "trailing slashes"
    )]
    #[case::credentials_with_any_origin(
        CorsConfig { allow_credentials: true, ..Default::default() },
        "`allow_any_origin: true`"
    )]
    #[case::credentials_with_wildcard_headers(
        CorsConfig { allow_any_origin: false, allow_credentials: true, allow_headers: vec!["*".into()], ..Default::default() },
        "wildcard in `allow_headers`"
    )]
    #[case::credentials_with_wildcard_methods(
        CorsConfig { allow_any_origin: false, allow_credentials: true, methods: vec!["*".into()], ..Default::default() },
        "wildcard in `methods`"
    )]
    #[case::invalid_method(
        CorsConfig { methods: vec!["BAD\nMETHOD".into()], ..Default::default() },
        "not a valid HTTP method"
    )]
    #[case::invalid_header(
        CorsConfig { allow_headers: vec!["bad\nheader".into()], ..Default::default() },
        "allow header name"
    )]
    fn invalid_configurations(#[case] config: CorsConfig, #[case] expected: &str) {
        let Err(ServerError::Cors(message)) = config.into_layer() else {
            panic!("expected a CORS error");
        };

        assert!(message.contains(expected), "{message}");
    }

    #[test]
    fn deserializes_humantime_max_age() {
        let config: CorsConfig =
            serde_json::from_value(serde_json::json!({"max_age": "10m"})).unwrap();

        assert_eq!(config.max_age, Some(Duration::from_secs(600)));
        assert!(config.allow_any_origin);
    }
}
